use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use axum_valid::Garde;
use garde::Validate;
use http::{StatusCode, header};
use tracing::debug;

use filmes_dal::{
    ListingParams,
    movie::{CreateMovie, MovieRepository, UpdateMovie},
};

use crate::error::{ApiError, ApiResult};
use crate::patch::PatchOperation;
use crate::state::AppState;

pub const DEFAULT_TAKE: i64 = 50;

crate::repository_from_request!(MovieRepository);

#[derive(Debug, Clone, Validate, serde::Deserialize)]
pub struct Paging {
    #[garde(range(min = 0))]
    skip: Option<i64>,
    #[garde(range(min = 1))]
    take: Option<i64>,
}

impl Paging {
    pub fn into_listing_params(self) -> ListingParams {
        ListingParams::new(self.skip.unwrap_or(0), self.take.unwrap_or(DEFAULT_TAKE))
    }
}

pub async fn create(
    State(state): State<AppState>,
    repository: MovieRepository,
    Garde(Json(payload)): Garde<Json<CreateMovie>>,
) -> ApiResult<impl IntoResponse> {
    let record = repository.create(payload).await?;
    let location = state.build_url(&format!("filme/{}", record.id))?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location.to_string())],
        Json(record),
    ))
}

pub async fn list(
    repository: MovieRepository,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let movies = repository.list(paging.into_listing_params()).await?;
    Ok((StatusCode::OK, Json(movies)))
}

pub async fn get(
    Path(id): Path<i64>,
    repository: MovieRepository,
) -> ApiResult<impl IntoResponse> {
    let record = repository.get(id).await?;

    Ok((StatusCode::OK, Json(record)))
}

pub async fn update(
    Path(id): Path<i64>,
    repository: MovieRepository,
    Garde(Json(payload)): Garde<Json<UpdateMovie>>,
) -> ApiResult<impl IntoResponse> {
    repository.update(id, payload).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

/// Applies an RFC 6902 patch to the stored movie projected into its
/// update shape. Any failing operation or invariant violation aborts
/// with 422 and nothing is persisted.
pub async fn patch(
    Path(id): Path<i64>,
    repository: MovieRepository,
    Json(operations): Json<Vec<PatchOperation>>,
) -> ApiResult<impl IntoResponse> {
    let movie = repository.get(id).await?;

    let mut doc = serde_json::to_value(UpdateMovie::from(movie))?;
    crate::patch::apply(&mut doc, &operations)
        .map_err(|e| ApiError::UnprocessablePatch(e.to_string()))?;
    let patched: UpdateMovie =
        serde_json::from_value(doc).map_err(|e| ApiError::UnprocessablePatch(e.to_string()))?;
    patched.validate().map_err(ApiError::ValidationFailed)?;

    debug!("Patching movie {id} with {} operations", operations.len());
    repository.update(id, patched).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

pub async fn delete(
    Path(id): Path<i64>,
    repository: MovieRepository,
) -> ApiResult<impl IntoResponse> {
    repository.delete(id).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<crate::state::AppState> {
    use axum::routing::{get as get_method, post};
    axum::Router::new()
        .route("/", post(create).get(list))
        .route(
            "/{id}",
            get_method(get).put(update).patch(patch).delete(delete),
        )
}
