//! SQLite-backed repository implementation.
//!
//! ## Database setup
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured from
//! [`PoolConfig`](crate::PoolConfig):
//! - **Bounded pool** — `max_open_conns` caps connections, idle connections
//!   are recycled after `max_idle_time`.
//! - **Startup ping** — [`Database::connect`] acquires and pings a connection
//!   under the connect deadline before returning.
//! - **WAL mode** — allows one writer and multiple concurrent readers.
//! - **Embedded migrations** — `sqlx::migrate!` runs `migrations/0001_create_movies.sql`
//!   automatically when the database is opened. The schema is idempotent.
//!
//! ## Repository
//!
//! [`SqliteMovieRepository`] holds a cloned `SqlitePool` plus the
//! [`QueryTimeouts`](crate::QueryTimeouts) and implements
//! [`MovieRepository`](crate::MovieRepository). Genres are stored as a JSON
//! array and `created_at` as unix seconds; see [`helpers`].

mod database;
mod movie_repo;
pub(crate) mod helpers;

pub use database::Database;
pub use movie_repo::SqliteMovieRepository;
