//! CatalogStore trait definition.
//!
//! Abstracts the persistence layer so the engine can run against the SQLite
//! implementation in production and against temp-file instances in tests.

use super::models::{Collection, NewCollection, NewTrack, Track, TrackHighlight};
use thiserror::Error;

/// Errors surfaced by catalog storage backends.
///
/// `NotFound` is distinct from the catch-all variants so callers can map a
/// missing entity to a caller error instead of a dependency failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for catalog storage backends.
///
/// Every method is an independently-dispatchable operation: the store holds
/// no cross-call state, and the member-set mutations are atomic primitives
/// rather than read-modify-write sequences, so concurrent track creation and
/// deletion cannot lose updates.
pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Tracks
    // =========================================================================

    /// Insert a new track, assigning its id and creation timestamp.
    fn insert_track(&self, new: NewTrack) -> StoreResult<Track>;

    /// Get a track by id.
    fn get_track(&self, id: &str) -> StoreResult<Option<Track>>;

    /// Persist the full row of an existing track. `NotFound` if absent.
    fn update_track(&self, track: &Track) -> StoreResult<()>;

    /// Delete a track by id. `NotFound` if absent.
    fn delete_track(&self, id: &str) -> StoreResult<()>;

    /// Delete every track whose collection reference equals `collection_id`.
    /// Returns the number of tracks deleted; zero matches is success.
    fn delete_tracks_in_collection(&self, collection_id: &str) -> StoreResult<usize>;

    // =========================================================================
    // Collections
    // =========================================================================

    /// Insert a new collection with an empty member set.
    fn insert_collection(&self, new: NewCollection) -> StoreResult<Collection>;

    /// Get a collection by id.
    fn get_collection(&self, id: &str) -> StoreResult<Option<Collection>>;

    /// Persist the scalar fields of an existing collection (members are not
    /// written through this path). `NotFound` if absent.
    fn update_collection(&self, collection: &Collection) -> StoreResult<()>;

    /// Delete a collection by id. Deleting an absent id is Ok (fail-soft).
    fn delete_collection(&self, id: &str) -> StoreResult<()>;

    // =========================================================================
    // Member set primitives
    // =========================================================================

    /// Atomically add `track_id` to the collection's member set. No-op if it
    /// is already a member; `NotFound` if the collection is absent.
    fn add_member(&self, collection_id: &str, track_id: &str) -> StoreResult<()>;

    /// Atomically remove `track_id` from the collection's member set. No-op
    /// if it is not a member or the collection is absent.
    fn remove_member(&self, collection_id: &str, track_id: &str) -> StoreResult<()>;

    // =========================================================================
    // Query surface
    // =========================================================================

    /// All tracks, most recently created first.
    fn list_tracks(&self) -> StoreResult<Vec<Track>>;

    /// Up to `n` tracks drawn uniformly without replacement, projected to
    /// display fields. Each call draws a fresh sample.
    fn sample_tracks(&self, n: usize) -> StoreResult<Vec<TrackHighlight>>;

    // =========================================================================
    // Counts (for the stats endpoint)
    // =========================================================================

    fn tracks_count(&self) -> usize;

    fn collections_count(&self) -> usize;
}
