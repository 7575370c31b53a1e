mod memory;
pub mod sqlite;
mod traits;

pub use memory::MemoryMovieRepository;
pub use traits::MovieRepository;

/// Identities below 1 are never assigned, so they can be rejected without a
/// backend round-trip.
pub(crate) fn is_resolvable(id: i64) -> bool {
    id >= 1
}
