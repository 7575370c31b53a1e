//! The model registry handed to callers.

use crate::config::QueryTimeouts;
use crate::persistence::sqlite::{Database, SqliteMovieRepository};
use crate::persistence::{MemoryMovieRepository, MovieRepository};

/// Aggregates the stores behind their repository traits.
///
/// Generic over the backend so handlers written against `Models<M>` run
/// unchanged on SQLite or on the in-memory substitute.
pub struct Models<M: MovieRepository> {
    pub movies: M,
}

impl Models<SqliteMovieRepository> {
    pub fn new(db: &Database, timeouts: QueryTimeouts) -> Self {
        Self {
            movies: SqliteMovieRepository::new(db.pool().clone(), timeouts),
        }
    }
}

impl Models<MemoryMovieRepository> {
    pub fn in_memory(timeouts: QueryTimeouts) -> Self {
        Self {
            movies: MemoryMovieRepository::new(timeouts),
        }
    }
}

impl<M: MovieRepository> Models<M> {
    pub fn with_movies(movies: M) -> Self {
        Self { movies }
    }
}
