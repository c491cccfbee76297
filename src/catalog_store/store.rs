//! SQLite-backed catalog store implementation.

use super::models::*;
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::{CatalogStore, StoreError, StoreResult};
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

/// SQLite-backed catalog store.
///
/// One mutex-guarded write connection plus a round-robin pool of read-only
/// connections, all in WAL mode so reads never block behind writes.
#[derive(Clone)]
pub struct SqliteCatalogStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;

    let latest_version = CATALOG_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &CATALOG_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if table_count == 0 {
        info!("Creating catalog db schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    let mut current_version = if db_version < BASE_DB_VERSION as i64 {
        0
    } else {
        (db_version - BASE_DB_VERSION as i64) as usize
    };

    if current_version >= latest_version {
        return latest_schema.validate(conn);
    }

    let tx = conn.transaction()?;
    for schema in CATALOG_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
        if let Some(migration_fn) = schema.migration {
            info!(
                "Migrating catalog db from version {} to {}",
                current_version, schema.version
            );
            migration_fn(&tx)?;
            current_version = schema.version;
        }
    }
    tx.pragma_update(None, "user_version", BASE_DB_VERSION + current_version)?;
    tx.commit()?;

    latest_schema.validate(conn)
}

fn track_from_row(row: &rusqlite::Row) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get("id")?,
        title: row.get("title")?,
        artist: row.get("artist")?,
        audio_url: row.get("audio_url")?,
        image_url: row.get("image_url")?,
        duration_secs: row.get("duration_secs")?,
        collection_id: row.get("collection_id")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_members(raw: &str) -> StoreResult<Vec<String>> {
    serde_json::from_str(raw)
        .map_err(|e| StoreError::CorruptRow(format!("bad members array: {}", e)))
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

const TRACK_COLUMNS: &str =
    "id, title, artist, audio_url, image_url, duration_secs, collection_id, created_at";

impl SqliteCatalogStore {
    /// Open (and create/migrate if needed) the catalog database.
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open catalog database")?;

        migrate_if_needed(&mut write_conn)?;

        write_conn.pragma_update(None, "journal_mode", "WAL")?;

        let track_count: i64 = write_conn
            .query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get(0))
            .unwrap_or(0);
        let collection_count: i64 = write_conn
            .query_row("SELECT COUNT(*) FROM collections", [], |r| r.get(0))
            .unwrap_or(0);

        info!(
            "Opened catalog: {} tracks, {} collections",
            track_count, collection_count
        );

        let mut read_pool = Vec::with_capacity(read_pool_size);
        for _ in 0..read_pool_size {
            let read_conn = Connection::open_with_flags(
                db_path_ref,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_conn.pragma_update(None, "journal_mode", "WAL")?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        Ok(Self {
            read_pool,
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::Relaxed) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    fn collection_exists(conn: &Connection, id: &str) -> StoreResult<bool> {
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM collections WHERE id = ?1", params![id], |r| {
                r.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn insert_track(&self, new: NewTrack) -> StoreResult<Track> {
        let track = Track {
            id: uuid::Uuid::new_v4().to_string(),
            title: new.title,
            artist: new.artist,
            audio_url: new.audio_url,
            image_url: new.image_url,
            duration_secs: new.duration_secs,
            collection_id: new.collection_id,
            created_at: now_millis(),
        };

        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tracks (id, title, artist, audio_url, image_url, duration_secs, collection_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                track.id,
                track.title,
                track.artist,
                track.audio_url,
                track.image_url,
                track.duration_secs,
                track.collection_id,
                track.created_at,
            ],
        )?;
        Ok(track)
    }

    fn get_track(&self, id: &str) -> StoreResult<Option<Track>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let track = conn
            .query_row(
                &format!("SELECT {} FROM tracks WHERE id = ?1", TRACK_COLUMNS),
                params![id],
                track_from_row,
            )
            .optional()?;
        Ok(track)
    }

    fn update_track(&self, track: &Track) -> StoreResult<()> {
        let conn = self.write_conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE tracks
             SET title = ?2, artist = ?3, audio_url = ?4, image_url = ?5,
                 duration_secs = ?6, collection_id = ?7
             WHERE id = ?1",
            params![
                track.id,
                track.title,
                track.artist,
                track.audio_url,
                track.image_url,
                track.duration_secs,
                track.collection_id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: "track",
                id: track.id.clone(),
            });
        }
        Ok(())
    }

    fn delete_track(&self, id: &str) -> StoreResult<()> {
        let conn = self.write_conn.lock().unwrap();
        let changed = conn.execute("DELETE FROM tracks WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: "track",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn delete_tracks_in_collection(&self, collection_id: &str) -> StoreResult<usize> {
        let conn = self.write_conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM tracks WHERE collection_id = ?1",
            params![collection_id],
        )?;
        Ok(deleted)
    }

    fn insert_collection(&self, new: NewCollection) -> StoreResult<Collection> {
        let collection = Collection {
            id: uuid::Uuid::new_v4().to_string(),
            title: new.title,
            artist: new.artist,
            image_url: new.image_url,
            release_year: new.release_year,
            members: Vec::new(),
            created_at: now_millis(),
        };

        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO collections (id, title, artist, image_url, release_year, members, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, '[]', ?6)",
            params![
                collection.id,
                collection.title,
                collection.artist,
                collection.image_url,
                collection.release_year,
                collection.created_at,
            ],
        )?;
        Ok(collection)
    }

    fn get_collection(&self, id: &str) -> StoreResult<Option<Collection>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, title, artist, image_url, release_year, members, created_at
                 FROM collections WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>("id")?,
                        row.get::<_, String>("title")?,
                        row.get::<_, String>("artist")?,
                        row.get::<_, String>("image_url")?,
                        row.get::<_, i64>("release_year")?,
                        row.get::<_, String>("members")?,
                        row.get::<_, i64>("created_at")?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((id, title, artist, image_url, release_year, members, created_at)) => {
                Ok(Some(Collection {
                    id,
                    title,
                    artist,
                    image_url,
                    release_year,
                    members: parse_members(&members)?,
                    created_at,
                }))
            }
        }
    }

    fn update_collection(&self, collection: &Collection) -> StoreResult<()> {
        let conn = self.write_conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE collections
             SET title = ?2, artist = ?3, image_url = ?4, release_year = ?5
             WHERE id = ?1",
            params![
                collection.id,
                collection.title,
                collection.artist,
                collection.image_url,
                collection.release_year,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: "collection",
                id: collection.id.clone(),
            });
        }
        Ok(())
    }

    fn delete_collection(&self, id: &str) -> StoreResult<()> {
        let conn = self.write_conn.lock().unwrap();
        // Deleting an absent collection is success, not an error.
        conn.execute("DELETE FROM collections WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn add_member(&self, collection_id: &str, track_id: &str) -> StoreResult<()> {
        let conn = self.write_conn.lock().unwrap();
        // Single guarded statement: appends only when the id is not already
        // in the array, so concurrent adds cannot produce duplicates.
        let changed = conn.execute(
            "UPDATE collections
             SET members = json_insert(members, '$[#]', ?2)
             WHERE id = ?1
               AND NOT EXISTS (
                   SELECT 1 FROM json_each(collections.members) WHERE json_each.value = ?2
               )",
            params![collection_id, track_id],
        )?;
        if changed == 0 {
            // Either the collection is missing or the track already a member.
            if !Self::collection_exists(&conn, collection_id)? {
                return Err(StoreError::NotFound {
                    kind: "collection",
                    id: collection_id.to_string(),
                });
            }
        }
        Ok(())
    }

    fn remove_member(&self, collection_id: &str, track_id: &str) -> StoreResult<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "UPDATE collections
             SET members = COALESCE(
                 (SELECT json_group_array(json_each.value)
                  FROM json_each(collections.members)
                  WHERE json_each.value <> ?2),
                 '[]')
             WHERE id = ?1",
            params![collection_id, track_id],
        )?;
        Ok(())
    }

    fn list_tracks(&self) -> StoreResult<Vec<Track>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tracks ORDER BY created_at DESC, rowid DESC",
            TRACK_COLUMNS
        ))?;
        let tracks = stmt
            .query_map([], track_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    fn sample_tracks(&self, n: usize) -> StoreResult<Vec<TrackHighlight>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, title, artist, image_url, audio_url
             FROM tracks ORDER BY RANDOM() LIMIT ?1",
        )?;
        let tracks = stmt
            .query_map(params![n as i64], |row| {
                Ok(TrackHighlight {
                    id: row.get("id")?,
                    title: row.get("title")?,
                    artist: row.get("artist")?,
                    image_url: row.get("image_url")?,
                    audio_url: row.get("audio_url")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    fn tracks_count(&self) -> usize {
        let conn = self.read_conn();
        let count: i64 = conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get(0))
            .unwrap_or(0);
        count as usize
    }

    fn collections_count(&self) -> usize {
        let conn = self.read_conn();
        let count: i64 = conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM collections", [], |r| r.get(0))
            .unwrap_or(0);
        count as usize
    }
}
