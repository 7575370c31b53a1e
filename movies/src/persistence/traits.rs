//! Async repository trait for movie records.
//!
//! Both the SQLite backend and the in-memory substitute implement
//! [`MovieRepository`], and [`Models`](crate::Models) is generic over it
//! (static dispatch).
//!
//! Methods return `impl Future + Send` rather than using `async fn` so that
//! the futures are guaranteed `Send` and can be moved onto `tokio::spawn`.

use std::future::Future;

use crate::error::StoreError;
use crate::record::Movie;

/// Storage operations for movies with optimistic concurrency.
///
/// Implementations must uphold:
/// - `get` and `delete` with `id < 1` return [`StoreError::NotFound`]
///   without touching the backend.
/// - `update` is a single conditional write gated on `movie.version`; a miss
///   is always [`StoreError::EditConflict`], never retried and never
///   disambiguated with a second read.
/// - every backend call is bounded by a deadline fixed at call entry.
pub trait MovieRepository: Send + Sync {
    /// Persist a new movie. The backend assigns `id`, `created_at` and
    /// `version = 1`, which are written back into `movie`.
    fn insert(&self, movie: &mut Movie) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get(&self, id: i64) -> impl Future<Output = Result<Movie, StoreError>> + Send;

    /// Overwrite the mutable fields if the stored version still equals
    /// `movie.version`. On success `movie.version` is advanced and the new
    /// version returned.
    fn update(&self, movie: &mut Movie) -> impl Future<Output = Result<i32, StoreError>> + Send;

    fn delete(&self, id: i64) -> impl Future<Output = Result<(), StoreError>> + Send;
}
