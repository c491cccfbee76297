//! Catalog entity models.
//!
//! A track optionally points at its collection via `collection_id`; the
//! collection holds the denormalized member id set on its side. Both sides are
//! only ever written through the engine's operations, which is what keeps the
//! relationship symmetric.

use serde::{Deserialize, Serialize};

/// A single playable media item with metadata and two asset URLs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub audio_url: String,
    pub image_url: String,
    pub duration_secs: i64,
    pub collection_id: Option<String>,
    /// Unix milliseconds, assigned by the store on insert.
    pub created_at: i64,
}

/// Field set for inserting a track; id and created_at are store-assigned.
#[derive(Clone, Debug)]
pub struct NewTrack {
    pub title: String,
    pub artist: String,
    pub audio_url: String,
    pub image_url: String,
    pub duration_secs: i64,
    pub collection_id: Option<String>,
}

/// A named grouping of tracks sharing a cover image and release metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub image_url: String,
    pub release_year: i64,
    /// Track ids currently belonging to this collection. Set semantics, no
    /// duplicates; stored as a JSON array column.
    pub members: Vec<String>,
    pub created_at: i64,
}

/// Field set for inserting a collection. New collections start with no
/// members; the member set only changes through track operations.
#[derive(Clone, Debug)]
pub struct NewCollection {
    pub title: String,
    pub artist: String,
    pub image_url: String,
    pub release_year: i64,
}

/// Display projection used by the discovery feeds. Exactly these five fields
/// and nothing else.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackHighlight {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub image_url: String,
    pub audio_url: String,
}
