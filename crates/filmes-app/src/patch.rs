//! RFC 6902 JSON Patch application over `serde_json::Value`.
//!
//! Operations are applied in sequence; the first failing operation aborts
//! the whole patch. Callers that need all-or-nothing semantics should
//! apply the patch to a throwaway copy of the document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Result<T, E = PatchError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
    Move { from: String, path: String },
    Copy { from: String, path: String },
    Test { path: String, value: Value },
}

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("Invalid JSON pointer: {0}")]
    InvalidPointer(String),

    #[error("Path does not exist: {0}")]
    PathNotFound(String),

    #[error("Invalid array index '{index}' in {path}")]
    InvalidIndex { path: String, index: String },

    #[error("Test failed at {path}: expected {expected}, found {actual}")]
    TestFailed {
        path: String,
        expected: Value,
        actual: Value,
    },

    #[error("Cannot remove document root")]
    RemoveRoot,

    #[error("Cannot move {from} into its own child {path}")]
    MoveIntoSelf { from: String, path: String },
}

pub fn apply(doc: &mut Value, operations: &[PatchOperation]) -> Result<()> {
    for operation in operations {
        apply_one(doc, operation)?;
    }
    Ok(())
}

fn apply_one(doc: &mut Value, operation: &PatchOperation) -> Result<()> {
    match operation {
        PatchOperation::Add { path, value } => add(doc, path, value.clone()),
        PatchOperation::Remove { path } => remove(doc, path).map(|_| ()),
        PatchOperation::Replace { path, value } => replace(doc, path, value.clone()),
        PatchOperation::Move { from, path } => {
            if path.starts_with(format!("{from}/").as_str()) {
                return Err(PatchError::MoveIntoSelf {
                    from: from.clone(),
                    path: path.clone(),
                });
            }
            let value = remove(doc, from)?;
            add(doc, path, value)
        }
        PatchOperation::Copy { from, path } => {
            let value = resolve(doc, from)?.clone();
            add(doc, path, value)
        }
        PatchOperation::Test { path, value } => {
            let actual = resolve(doc, path)?;
            if actual == value {
                Ok(())
            } else {
                Err(PatchError::TestFailed {
                    path: path.clone(),
                    expected: value.clone(),
                    actual: actual.clone(),
                })
            }
        }
    }
}

/// Splits a JSON pointer into unescaped reference tokens.
fn parse_pointer(pointer: &str) -> Result<Vec<String>> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    if !pointer.starts_with('/') {
        return Err(PatchError::InvalidPointer(pointer.to_string()));
    }
    Ok(pointer
        .split('/')
        .skip(1)
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect())
}

fn parse_index(token: &str, len: usize, allow_end: bool, path: &str) -> Result<usize> {
    if token == "-" && allow_end {
        return Ok(len);
    }
    // RFC 6901 forbids leading zeros
    if token.len() > 1 && token.starts_with('0') {
        return Err(PatchError::InvalidIndex {
            path: path.to_string(),
            index: token.to_string(),
        });
    }
    let index: usize = token.parse().map_err(|_| PatchError::InvalidIndex {
        path: path.to_string(),
        index: token.to_string(),
    })?;
    let max = if allow_end { len } else { len.saturating_sub(1) };
    if len == 0 && !allow_end || index > max {
        return Err(PatchError::PathNotFound(path.to_string()));
    }
    Ok(index)
}

fn step<'a>(current: &'a mut Value, token: &str, path: &str) -> Result<&'a mut Value> {
    match current {
        Value::Object(map) => map
            .get_mut(token)
            .ok_or_else(|| PatchError::PathNotFound(path.to_string())),
        Value::Array(items) => {
            let index = parse_index(token, items.len(), false, path)?;
            Ok(&mut items[index])
        }
        _ => Err(PatchError::PathNotFound(path.to_string())),
    }
}

fn resolve_mut<'a>(doc: &'a mut Value, tokens: &[String], path: &str) -> Result<&'a mut Value> {
    let mut current = doc;
    for token in tokens {
        current = step(current, token, path)?;
    }
    Ok(current)
}

fn resolve<'a>(doc: &'a Value, pointer: &str) -> Result<&'a Value> {
    let tokens = parse_pointer(pointer)?;
    let mut current = doc;
    for token in &tokens {
        current = match current {
            Value::Object(map) => map
                .get(token)
                .ok_or_else(|| PatchError::PathNotFound(pointer.to_string()))?,
            Value::Array(items) => {
                let index = parse_index(token, items.len(), false, pointer)?;
                &items[index]
            }
            _ => return Err(PatchError::PathNotFound(pointer.to_string())),
        };
    }
    Ok(current)
}

fn add(doc: &mut Value, path: &str, value: Value) -> Result<()> {
    let tokens = parse_pointer(path)?;
    let Some((last, parents)) = tokens.split_last() else {
        *doc = value;
        return Ok(());
    };
    let parent = resolve_mut(doc, parents, path)?;
    match parent {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index = parse_index(last, items.len(), true, path)?;
            items.insert(index, value);
            Ok(())
        }
        _ => Err(PatchError::PathNotFound(path.to_string())),
    }
}

fn remove(doc: &mut Value, path: &str) -> Result<Value> {
    let tokens = parse_pointer(path)?;
    let Some((last, parents)) = tokens.split_last() else {
        return Err(PatchError::RemoveRoot);
    };
    let parent = resolve_mut(doc, parents, path)?;
    match parent {
        Value::Object(map) => map
            .remove(last)
            .ok_or_else(|| PatchError::PathNotFound(path.to_string())),
        Value::Array(items) => {
            let index = parse_index(last, items.len(), false, path)?;
            Ok(items.remove(index))
        }
        _ => Err(PatchError::PathNotFound(path.to_string())),
    }
}

fn replace(doc: &mut Value, path: &str, value: Value) -> Result<()> {
    let tokens = parse_pointer(path)?;
    let target = resolve_mut(doc, &tokens, path)?;
    *target = value;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn movie_doc() -> Value {
        json!({"title": "Dune", "genre": "Sci-Fi", "duration_minutes": 155})
    }

    fn op(raw: Value) -> PatchOperation {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn replace_scalar_field() {
        let mut doc = movie_doc();
        let ops = [op(json!({"op": "replace", "path": "/duration_minutes", "value": 166}))];
        apply(&mut doc, &ops).unwrap();
        assert_eq!(
            doc,
            json!({"title": "Dune", "genre": "Sci-Fi", "duration_minutes": 166})
        );
    }

    #[test]
    fn replace_missing_path_fails() {
        let mut doc = movie_doc();
        let ops = [op(json!({"op": "replace", "path": "/director", "value": "Villeneuve"}))];
        assert!(matches!(
            apply(&mut doc, &ops),
            Err(PatchError::PathNotFound(_))
        ));
    }

    #[test]
    fn add_and_remove_object_member() {
        let mut doc = movie_doc();
        apply(
            &mut doc,
            &[op(json!({"op": "add", "path": "/rating", "value": 9}))],
        )
        .unwrap();
        assert_eq!(doc["rating"], json!(9));

        apply(&mut doc, &[op(json!({"op": "remove", "path": "/rating"}))]).unwrap();
        assert_eq!(doc, movie_doc());
    }

    #[test]
    fn array_operations() {
        let mut doc = json!({"tags": ["a", "c"]});
        apply(
            &mut doc,
            &[
                op(json!({"op": "add", "path": "/tags/1", "value": "b"})),
                op(json!({"op": "add", "path": "/tags/-", "value": "d"})),
            ],
        )
        .unwrap();
        assert_eq!(doc, json!({"tags": ["a", "b", "c", "d"]}));

        apply(&mut doc, &[op(json!({"op": "remove", "path": "/tags/0"}))]).unwrap();
        assert_eq!(doc, json!({"tags": ["b", "c", "d"]}));

        let out_of_bounds = apply(&mut doc, &[op(json!({"op": "remove", "path": "/tags/9"}))]);
        assert!(matches!(out_of_bounds, Err(PatchError::PathNotFound(_))));

        let leading_zero = apply(
            &mut doc,
            &[op(json!({"op": "remove", "path": "/tags/01"}))],
        );
        assert!(matches!(leading_zero, Err(PatchError::InvalidIndex { .. })));
    }

    #[test]
    fn move_and_copy() {
        let mut doc = json!({"title": "Dune", "alias": "Duna"});
        apply(
            &mut doc,
            &[op(json!({"op": "move", "from": "/alias", "path": "/original_title"}))],
        )
        .unwrap();
        assert_eq!(doc, json!({"title": "Dune", "original_title": "Duna"}));

        apply(
            &mut doc,
            &[op(json!({"op": "copy", "from": "/title", "path": "/display_title"}))],
        )
        .unwrap();
        assert_eq!(doc["display_title"], json!("Dune"));
    }

    #[test]
    fn test_op_gates_sequence() {
        let mut doc = movie_doc();
        let ops = [
            op(json!({"op": "test", "path": "/genre", "value": "Drama"})),
            op(json!({"op": "replace", "path": "/genre", "value": "Epic"})),
        ];
        assert!(matches!(
            apply(&mut doc, &ops),
            Err(PatchError::TestFailed { .. })
        ));
        // failing test op means the replace never ran
        assert_eq!(doc["genre"], json!("Sci-Fi"));

        let ops = [
            op(json!({"op": "test", "path": "/genre", "value": "Sci-Fi"})),
            op(json!({"op": "replace", "path": "/genre", "value": "Epic"})),
        ];
        apply(&mut doc, &ops).unwrap();
        assert_eq!(doc["genre"], json!("Epic"));
    }

    #[test]
    fn escaped_pointer_tokens() {
        let mut doc = json!({"a/b": 1, "m~n": 2});
        apply(
            &mut doc,
            &[
                op(json!({"op": "replace", "path": "/a~1b", "value": 10})),
                op(json!({"op": "replace", "path": "/m~0n", "value": 20})),
            ],
        )
        .unwrap();
        assert_eq!(doc, json!({"a/b": 10, "m~n": 20}));
    }

    #[test]
    fn pointer_must_start_with_slash() {
        let mut doc = movie_doc();
        let ops = [op(json!({"op": "replace", "path": "title", "value": "x"}))];
        assert!(matches!(
            apply(&mut doc, &ops),
            Err(PatchError::InvalidPointer(_))
        ));
    }

    #[test]
    fn whole_document_replace_and_root_remove() {
        let mut doc = movie_doc();
        apply(
            &mut doc,
            &[op(json!({"op": "replace", "path": "", "value": {"x": 1}}))],
        )
        .unwrap();
        assert_eq!(doc, json!({"x": 1}));

        assert!(matches!(
            apply(&mut doc, &[op(json!({"op": "remove", "path": ""}))]),
            Err(PatchError::RemoveRoot)
        ));
    }
}
