//! SQLite schema for the media catalog database.
//!
//! Tracks carry a nullable collection_id foreign key; collections carry the
//! member id set as a JSON array. No junction table: the engine keeps the two
//! sides symmetric.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

const TRACKS_TABLE: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("audio_url", &SqlType::Text, non_null = true),
        sqlite_column!("image_url", &SqlType::Text, non_null = true),
        sqlite_column!("duration_secs", &SqlType::Integer, non_null = true),
        sqlite_column!("collection_id", &SqlType::Text),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_tracks_collection", "collection_id"),
        ("idx_tracks_created_at", "created_at"),
    ],
};

const COLLECTIONS_TABLE: Table = Table {
    name: "collections",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("image_url", &SqlType::Text, non_null = true),
        sqlite_column!("release_year", &SqlType::Integer, non_null = true),
        // JSON array of member track ids
        sqlite_column!("members", &SqlType::Text, non_null = true, default_value = Some("'[]'")),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[TRACKS_TABLE, COLLECTIONS_TABLE],
    migration: None,
}];
