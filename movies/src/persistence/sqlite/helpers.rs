//! Shared encode/decode helpers for SQLite ↔ domain type conversions.
//!
//! SQLite has no array type, so genres are stored as a JSON array in a
//! `TEXT` column. `created_at` is stored as unix seconds.

use chrono::{DateTime, Utc};

use crate::error::StorageError;

// ── genres ─────────────────────────────────────────────────────────────

/// Encode the ordered genre list for the `genres` column.
pub fn encode_genres(genres: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(genres).map_err(|e| StorageError::Corrupt(e.to_string()))
}

/// Decode the `genres` column, preserving order.
pub fn decode_genres(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw)
        .map_err(|e| StorageError::Corrupt(format!("genres column {raw:?}: {e}")))
}

// ── created_at ─────────────────────────────────────────────────────────

pub fn decode_created_at(secs: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StorageError::Corrupt(format!("created_at out of range: {secs}")))
}
