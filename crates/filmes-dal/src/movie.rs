use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::Pool;
use tracing::debug;

use crate::{ListingParams, error::Result};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateMovie {
    #[garde(length(min = 1, max = 255))]
    pub title: String,
    #[garde(length(min = 1, max = 50))]
    pub genre: String,
    #[garde(range(min = 1))]
    pub duration_minutes: i64,
}

/// Full replacement payload - also the shape a stored movie is projected
/// into before a JSON patch is applied to it.
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct UpdateMovie {
    #[garde(length(min = 1, max = 255))]
    pub title: String,
    #[garde(length(min = 1, max = 50))]
    pub genre: String,
    #[garde(range(min = 1))]
    pub duration_minutes: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub genre: String,
    pub duration_minutes: i64,
}

impl From<Movie> for UpdateMovie {
    fn from(value: Movie) -> Self {
        Self {
            title: value.title,
            genre: value.genre,
            duration_minutes: value.duration_minutes,
        }
    }
}

pub type MovieRepository = MovieRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct MovieRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> MovieRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateMovie) -> Result<Movie> {
        let result =
            sqlx::query("INSERT INTO movie (title, genre, duration_minutes) VALUES (?, ?, ?)")
                .bind(&payload.title)
                .bind(&payload.genre)
                .bind(payload.duration_minutes)
                .execute(&self.executor)
                .await?;

        let id = result.last_insert_rowid();
        debug!("Created movie {id}");
        self.get(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Movie> {
        sqlx::query_as::<_, Movie>(
            "SELECT id, title, genre, duration_minutes FROM movie WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| crate::Error::RecordNotFound("Movie".to_string()))
    }

    /// Ordered by id ascending, so offset paging is stable.
    pub async fn list(&self, params: ListingParams) -> Result<Vec<Movie>> {
        let records = sqlx::query_as::<_, Movie>(
            "SELECT id, title, genre, duration_minutes FROM movie ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(params.limit())
        .bind(params.offset)
        .fetch(&self.executor)
        .try_collect::<Vec<_>>()
        .await?;
        Ok(records)
    }

    pub async fn update(&self, id: i64, payload: UpdateMovie) -> Result<Movie> {
        let result =
            sqlx::query("UPDATE movie SET title = ?, genre = ?, duration_minutes = ? WHERE id = ?")
                .bind(&payload.title)
                .bind(&payload.genre)
                .bind(payload.duration_minutes)
                .bind(id)
                .execute(&self.executor)
                .await?;

        if result.rows_affected() == 0 {
            Err(crate::Error::RecordNotFound("Movie".to_string()))
        } else {
            self.get(id).await
        }
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM movie WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(crate::error::Error::RecordNotFound("Movie".to_string()))
        } else {
            debug!("Deleted movie {id}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_projection_drops_id_only() {
        let movie = Movie {
            id: 7,
            title: "Dune".to_string(),
            genre: "Sci-Fi".to_string(),
            duration_minutes: 155,
        };
        let update = UpdateMovie::from(movie.clone());
        assert_eq!(update.title, movie.title);
        assert_eq!(update.genre, movie.genre);
        assert_eq!(update.duration_minutes, movie.duration_minutes);
    }

    #[test]
    fn field_invariants() {
        let valid = CreateMovie {
            title: "Dune".to_string(),
            genre: "Sci-Fi".to_string(),
            duration_minutes: 155,
        };
        assert!(valid.validate().is_ok());

        let bad_duration = UpdateMovie {
            duration_minutes: 0,
            ..UpdateMovie::from(Movie {
                id: 1,
                title: "Dune".to_string(),
                genre: "Sci-Fi".to_string(),
                duration_minutes: 155,
            })
        };
        assert!(bad_duration.validate().is_err());

        let long_genre = CreateMovie {
            genre: "g".repeat(51),
            ..valid.clone()
        };
        assert!(long_genre.validate().is_err());
    }
}
