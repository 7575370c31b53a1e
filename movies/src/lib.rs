//! Data-access layer for versioned movie records.
//!
//! The crate is organised leaf to root:
//!
//! - [`Movie`] / [`Runtime`] — the in-memory record and its version tag.
//! - [`validator`] — field-violation collection, `validate_movie`.
//! - [`persistence`] — the [`MovieRepository`] trait with a SQLite-backed
//!   implementation and an in-memory substitute.
//! - [`Models`] — the registry callers hold, generic over the backend.
//!
//! Concurrent edits are detected with an optimistic version counter: every
//! update is a single conditional statement gated on the version the caller
//! last read, and a miss is reported as [`StoreError::EditConflict`].

pub mod config;
pub mod deadline;
pub mod error;
pub mod persistence;
pub mod record;
pub mod registry;
pub mod validator;

pub use config::{PoolConfig, QueryTimeouts};
pub use deadline::Deadline;
pub use error::{ErrorKind, StorageError, StoreError};
pub use persistence::sqlite::{Database, SqliteMovieRepository};
pub use persistence::{MemoryMovieRepository, MovieRepository};
pub use record::{Movie, Runtime, RuntimeFormatError};
pub use registry::Models;
pub use validator::{validate_movie, ValidationErrors, Validator};
