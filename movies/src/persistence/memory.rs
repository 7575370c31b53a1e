//! In-memory [`MovieRepository`] for tests and tooling.
//!
//! Rows live in a map behind a mutex; the version check and the write happen
//! under one lock acquisition, which gives the same atomic conditional write
//! the SQLite store gets from its `UPDATE ... WHERE version = ?`.
//!
//! Two knobs make it useful as a test double:
//! - [`backend_calls`](MemoryMovieRepository::backend_calls) counts every
//!   operation that reached the backing map.
//! - [`with_latency`](MemoryMovieRepository::with_latency) delays every
//!   backend access, to exercise deadlines.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;

use crate::config::QueryTimeouts;
use crate::deadline::Deadline;
use crate::error::StoreError;
use crate::persistence::is_resolvable;
use crate::persistence::traits::MovieRepository;
use crate::record::Movie;

#[derive(Default)]
struct MemoryState {
    rows: BTreeMap<i64, Movie>,
    last_id: i64,
}

pub struct MemoryMovieRepository {
    state: Mutex<MemoryState>,
    backend_calls: AtomicUsize,
    latency: Duration,
    timeouts: QueryTimeouts,
}

impl Default for MemoryMovieRepository {
    fn default() -> Self {
        Self::new(QueryTimeouts::default())
    }
}

impl MemoryMovieRepository {
    pub fn new(timeouts: QueryTimeouts) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            backend_calls: AtomicUsize::new(0),
            latency: Duration::ZERO,
            timeouts,
        }
    }

    /// Delay every backend access by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of operations that reached the backing map.
    pub fn backend_calls(&self) -> usize {
        self.backend_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter_backend(&self) {
        self.backend_calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl MovieRepository for MemoryMovieRepository {
    async fn insert(&self, movie: &mut Movie) -> Result<(), StoreError> {
        let deadline = Deadline::after(self.timeouts.write);
        let stored = deadline
            .run("insert", async {
                self.enter_backend().await;
                let mut state = self.lock();
                state.last_id += 1;
                let stored = Movie {
                    id: state.last_id,
                    created_at: Utc::now(),
                    version: 1,
                    ..movie.clone()
                };
                state.rows.insert(stored.id, stored.clone());
                Ok::<_, StoreError>(stored)
            })
            .await?;

        movie.id = stored.id;
        movie.created_at = stored.created_at;
        movie.version = stored.version;
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Movie, StoreError> {
        if !is_resolvable(id) {
            return Err(StoreError::NotFound);
        }
        let deadline = Deadline::after(self.timeouts.read);
        deadline
            .run("get", async {
                self.enter_backend().await;
                self.lock().rows.get(&id).cloned().ok_or(StoreError::NotFound)
            })
            .await
    }

    async fn update(&self, movie: &mut Movie) -> Result<i32, StoreError> {
        let deadline = Deadline::after(self.timeouts.write);
        let version = deadline
            .run("update", async {
                self.enter_backend().await;
                let mut state = self.lock();
                let row = state
                    .rows
                    .get_mut(&movie.id)
                    .filter(|row| row.version == movie.version)
                    .ok_or(StoreError::EditConflict)?;
                row.title = movie.title.clone();
                row.year = movie.year;
                row.runtime = movie.runtime;
                row.genres = movie.genres.clone();
                row.version += 1;
                Ok::<_, StoreError>(row.version)
            })
            .await?;

        movie.version = version;
        Ok(version)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        if !is_resolvable(id) {
            return Err(StoreError::NotFound);
        }
        let deadline = Deadline::after(self.timeouts.write);
        deadline
            .run("delete", async {
                self.enter_backend().await;
                self.lock()
                    .rows
                    .remove(&id)
                    .map(|_| ())
                    .ok_or(StoreError::NotFound)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn sample_movie() -> Movie {
        Movie::new("Moana", 2016, 107, ["animation", "adventure"])
    }

    #[tokio::test]
    async fn test_insert_assigns_identity_and_version() {
        let repo = MemoryMovieRepository::default();
        let mut movie = sample_movie();
        repo.insert(&mut movie).await.unwrap();
        assert_eq!(movie.id, 1);
        assert_eq!(movie.version, 1);
        assert!(movie.created_at.timestamp() > 0);
        assert_eq!(repo.get(1).await.unwrap(), movie);
    }

    #[tokio::test]
    async fn test_invalid_ids_are_not_counted() {
        let repo = MemoryMovieRepository::default();
        for id in [0, -1, i64::MIN] {
            assert!(matches!(repo.get(id).await, Err(StoreError::NotFound)));
            assert!(matches!(repo.delete(id).await, Err(StoreError::NotFound)));
        }
        assert_eq!(repo.backend_calls(), 0);

        assert!(matches!(repo.get(1).await, Err(StoreError::NotFound)));
        assert_eq!(repo.backend_calls(), 1);
    }

    #[tokio::test]
    async fn test_stale_update_leaves_row_untouched() {
        let repo = MemoryMovieRepository::default();
        let mut movie = sample_movie();
        repo.insert(&mut movie).await.unwrap();

        let mut stale = movie.clone();
        stale.version = 7;
        stale.title = "Vaiana".to_string();
        assert!(matches!(
            repo.update(&mut stale).await,
            Err(StoreError::EditConflict)
        ));
        assert_eq!(stale.version, 7);
        assert_eq!(repo.get(movie.id).await.unwrap(), movie);
    }

    #[tokio::test]
    async fn test_racing_updates_have_one_winner() {
        let repo = MemoryMovieRepository::default();
        let mut movie = sample_movie();
        repo.insert(&mut movie).await.unwrap();

        let mut a = movie.clone();
        a.title = "Moana (A)".to_string();
        let mut b = movie.clone();
        b.title = "Moana (B)".to_string();

        let (ra, rb) = tokio::join!(repo.update(&mut a), repo.update(&mut b));
        let winner = match (ra, rb) {
            (Ok(2), Err(StoreError::EditConflict)) => {
                assert_eq!(b.version, 1);
                a
            }
            (Err(StoreError::EditConflict), Ok(2)) => {
                assert_eq!(a.version, 1);
                b
            }
            other => panic!("expected exactly one winner, got {other:?}"),
        };
        let stored = repo.get(movie.id).await.unwrap();
        assert_eq!(stored.title, winner.title);
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let repo = MemoryMovieRepository::default();
        let mut movie = sample_movie();
        repo.insert(&mut movie).await.unwrap();
        repo.delete(movie.id).await.unwrap();
        assert!(matches!(repo.delete(movie.id).await, Err(StoreError::NotFound)));
        assert!(matches!(repo.get(movie.id).await, Err(StoreError::NotFound)));
        assert!(repo.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_read_fails_at_deadline() {
        let repo = MemoryMovieRepository::new(QueryTimeouts::uniform(Duration::from_millis(50)))
            .with_latency(Duration::from_millis(200));

        let started = Instant::now();
        let err = repo.get(1).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(err.is_deadline_exceeded());
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(60), "took {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_write_does_not_apply() {
        let repo = MemoryMovieRepository::new(QueryTimeouts::uniform(Duration::from_millis(50)))
            .with_latency(Duration::from_millis(200));
        let mut movie = sample_movie();
        let err = repo.insert(&mut movie).await.unwrap_err();
        assert!(err.is_deadline_exceeded());
        assert_eq!(movie.id, 0);
        assert!(repo.is_empty());
    }
}
