//! SQLite-backed repository for movies.

use sqlx::SqlitePool;

use super::helpers::{decode_created_at, decode_genres, encode_genres};
use crate::config::QueryTimeouts;
use crate::deadline::Deadline;
use crate::error::{StorageError, StoreError};
use crate::persistence::is_resolvable;
use crate::persistence::traits::MovieRepository;
use crate::record::{Movie, Runtime};

/// Row type for movie queries, mapped via `sqlx::FromRow`.
#[derive(sqlx::FromRow)]
struct MovieRow {
    id: i64,
    created_at: i64,
    title: String,
    year: i64,
    runtime: i64,
    genres: String,
    version: i64,
}

impl TryFrom<MovieRow> for Movie {
    type Error = StorageError;

    fn try_from(r: MovieRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            created_at: decode_created_at(r.created_at)?,
            title: r.title,
            year: narrow("year", r.year)?,
            runtime: Runtime(narrow("runtime", r.runtime)?),
            genres: decode_genres(&r.genres)?,
            version: narrow("version", r.version)?,
        })
    }
}

fn narrow(column: &str, value: i64) -> Result<i32, StorageError> {
    i32::try_from(value)
        .map_err(|_| StorageError::Corrupt(format!("{column} out of range: {value}")))
}

/// SQLite implementation of [`MovieRepository`].
pub struct SqliteMovieRepository {
    pool: SqlitePool,
    timeouts: QueryTimeouts,
}

impl SqliteMovieRepository {
    pub fn new(pool: SqlitePool, timeouts: QueryTimeouts) -> Self {
        Self { pool, timeouts }
    }
}

impl MovieRepository for SqliteMovieRepository {
    async fn insert(&self, movie: &mut Movie) -> Result<(), StoreError> {
        let genres = encode_genres(&movie.genres)?;
        let deadline = Deadline::after(self.timeouts.write);

        let (id, created_at, version): (i64, i64, i64) = deadline
            .run("insert", async {
                sqlx::query_as(
                    r#"
                    INSERT INTO movies (title, year, runtime, genres)
                    VALUES (?, ?, ?, ?)
                    RETURNING id, created_at, version
                    "#,
                )
                .bind(&movie.title)
                .bind(movie.year)
                .bind(movie.runtime.minutes())
                .bind(&genres)
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::from)
            })
            .await?;

        movie.id = id;
        movie.created_at = decode_created_at(created_at)?;
        movie.version = narrow("version", version)?;

        tracing::debug!(id, "Inserted movie");
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Movie, StoreError> {
        if !is_resolvable(id) {
            return Err(StoreError::NotFound);
        }
        let deadline = Deadline::after(self.timeouts.read);

        let row: Option<MovieRow> = deadline
            .run("get", async {
                sqlx::query_as(
                    r#"
                    SELECT id, created_at, title, year, runtime, genres, version
                    FROM movies
                    WHERE id = ?
                    "#,
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::from)
            })
            .await?;

        match row {
            None => Err(StoreError::NotFound),
            Some(r) => Ok(Movie::try_from(r)?),
        }
    }

    async fn update(&self, movie: &mut Movie) -> Result<i32, StoreError> {
        let genres = encode_genres(&movie.genres)?;
        let deadline = Deadline::after(self.timeouts.write);

        // The version predicate is the whole concurrency protocol: no row
        // matches if another writer advanced the version or the row is gone.
        let row: Option<(i64,)> = deadline
            .run("update", async {
                sqlx::query_as(
                    r#"
                    UPDATE movies
                    SET title = ?, year = ?, runtime = ?, genres = ?, version = version + 1
                    WHERE id = ? AND version = ?
                    RETURNING version
                    "#,
                )
                .bind(&movie.title)
                .bind(movie.year)
                .bind(movie.runtime.minutes())
                .bind(&genres)
                .bind(movie.id)
                .bind(movie.version)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::from)
            })
            .await?;

        match row {
            None => {
                tracing::debug!(id = movie.id, version = movie.version, "Edit conflict");
                Err(StoreError::EditConflict)
            }
            Some((version,)) => {
                movie.version = narrow("version", version)?;
                tracing::debug!(id = movie.id, version = movie.version, "Updated movie");
                Ok(movie.version)
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        if !is_resolvable(id) {
            return Err(StoreError::NotFound);
        }
        let deadline = Deadline::after(self.timeouts.write);

        let result = deadline
            .run("delete", async {
                sqlx::query("DELETE FROM movies WHERE id = ?")
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(StoreError::from)
            })
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        tracing::debug!(id, "Deleted movie");
        Ok(())
    }
}
