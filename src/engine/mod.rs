//! Consistency engine for the track/collection relationship.
//!
//! All catalog mutations go through this module. The relationship between a
//! track's `collection_id` and the collection's member set is only ever
//! written here, which is what makes the symmetry invariant enforceable:
//! for every track with collection reference `c`, the track id appears in
//! `c.members`, and vice versa.
//!
//! The engine is stateless; one instance is shared across requests and every
//! operation is a sequence of independently-dispatchable store calls with no
//! engine-held locks.

use crate::blob_store::{BlobError, BlobPayload, BlobStore};
use crate::catalog_store::{
    CatalogStore, Collection, NewCollection, NewTrack, StoreError, Track, TrackHighlight,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A required binary payload was absent. Caller error.
    #[error("missing required asset: {0}")]
    MissingAsset(&'static str),

    /// A referenced entity does not exist. Caller error.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The blob adapter failed an upload. Dependency failure.
    #[error("ingestion failure: {0}")]
    Ingestion(#[from] BlobError),

    /// The persistence layer failed. Dependency failure.
    #[error("store failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => CatalogError::NotFound { kind, id },
            other => CatalogError::Store(other),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Capability witnessing that the caller passed the admin gate.
///
/// Mutating operations take this explicitly instead of reading an ambient
/// "is admin" flag; only the HTTP access layer (and in-crate tests) can mint
/// one.
pub struct AdminKey(());

impl AdminKey {
    pub(crate) fn new() -> Self {
        AdminKey(())
    }
}

#[derive(Debug, Default)]
pub struct CreateTrackRequest {
    pub title: String,
    pub artist: String,
    pub duration_secs: i64,
    pub collection_id: Option<String>,
    pub audio: Option<BlobPayload>,
    pub image: Option<BlobPayload>,
}

/// Outcome of a successful track creation.
///
/// `membership_warning` carries the reconciliation gap: the track exists but
/// could not be appended to its collection's member set. The creation itself
/// is still the success signal.
#[derive(Debug)]
pub struct TrackCreated {
    pub track: Track,
    pub membership_warning: Option<String>,
}

#[derive(Debug, Default)]
pub struct EditTrackRequest {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub duration_secs: Option<i64>,
    /// `None` leaves the collection reference unchanged; `Some("")` clears
    /// it; any other value reassigns.
    pub collection_id: Option<String>,
    pub audio: Option<BlobPayload>,
    pub image: Option<BlobPayload>,
}

#[derive(Debug, Default)]
pub struct CreateCollectionRequest {
    pub title: String,
    pub artist: String,
    pub release_year: i64,
    pub image: Option<BlobPayload>,
}

#[derive(Debug, Default)]
pub struct EditCollectionRequest {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub release_year: Option<i64>,
    pub image: Option<BlobPayload>,
}

/// Treat empty/whitespace ids as "no collection" so the reassignment
/// comparison never runs on unnormalized representations.
fn normalize_id(id: Option<String>) -> Option<String> {
    id.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

async fn upload_opt(
    blobs: &dyn BlobStore,
    payload: &Option<BlobPayload>,
) -> Result<Option<String>, BlobError> {
    match payload {
        Some(payload) => Ok(Some(blobs.upload(payload).await?)),
        None => Ok(None),
    }
}

pub struct CatalogEngine {
    store: Arc<dyn CatalogStore>,
    blobs: Arc<dyn BlobStore>,
}

impl CatalogEngine {
    pub fn new(store: Arc<dyn CatalogStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    // =========================================================================
    // Track mutations
    // =========================================================================

    /// Create a track. Both payloads are required; uploads run concurrently
    /// and either failure aborts before anything is persisted. The member
    /// append to the referenced collection is best-effort: its failure is
    /// logged and reported as a warning, not as an operation failure.
    pub async fn create_track(
        &self,
        _key: &AdminKey,
        request: CreateTrackRequest,
    ) -> CatalogResult<TrackCreated> {
        let audio = request.audio.ok_or(CatalogError::MissingAsset("audio_file"))?;
        let image = request.image.ok_or(CatalogError::MissingAsset("image_file"))?;
        let collection_id = normalize_id(request.collection_id);

        let (audio_url, image_url) =
            futures::try_join!(self.blobs.upload(&audio), self.blobs.upload(&image))?;

        let track = self.store.insert_track(NewTrack {
            title: request.title,
            artist: request.artist,
            audio_url,
            image_url,
            duration_secs: request.duration_secs,
            collection_id: collection_id.clone(),
        })?;

        let membership_warning = match &collection_id {
            Some(collection_id) => self
                .append_member_best_effort(collection_id, &track.id)
                .err(),
            None => None,
        };

        info!("Created track {} ({})", track.id, track.title);
        Ok(TrackCreated {
            track,
            membership_warning,
        })
    }

    /// Delete a track, removing it from its collection's member set first.
    /// If the member removal fails the delete does not proceed, so a
    /// dangling member id is never left behind.
    pub async fn delete_track(&self, _key: &AdminKey, id: &str) -> CatalogResult<()> {
        let track = self.get_track_or_not_found(id)?;

        if let Some(collection_id) = &track.collection_id {
            self.store
                .remove_member(collection_id, id)
                .map_err(CatalogError::Store)?;
        }

        self.store.delete_track(id)?;
        info!("Deleted track {}", id);
        Ok(())
    }

    /// Edit a track: collection reassignment first, then any replacement
    /// uploads, then scalar fields, then a single persist. An upload failure
    /// aborts before any field is written, but membership moves already
    /// committed in this call are not rolled back.
    pub async fn edit_track(
        &self,
        _key: &AdminKey,
        id: &str,
        request: EditTrackRequest,
    ) -> CatalogResult<Track> {
        let mut track = self.get_track_or_not_found(id)?;

        if let Some(requested) = request.collection_id {
            let new_ref = normalize_id(Some(requested));
            if track.collection_id != new_ref {
                // Check the target before removing from the old member set,
                // so a bad id fails with no side effects instead of leaving
                // the track referencing a collection it was dropped from.
                if let Some(new_id) = &new_ref {
                    if self.store.get_collection(new_id)?.is_none() {
                        return Err(CatalogError::NotFound {
                            kind: "collection",
                            id: new_id.clone(),
                        });
                    }
                }
                if let Some(old_id) = &track.collection_id {
                    self.store
                        .remove_member(old_id, id)
                        .map_err(CatalogError::Store)?;
                }
                if let Some(new_id) = &new_ref {
                    self.store.add_member(new_id, id)?;
                }
                track.collection_id = new_ref;
            }
        }

        let (audio_url, image_url) = futures::try_join!(
            upload_opt(self.blobs.as_ref(), &request.audio),
            upload_opt(self.blobs.as_ref(), &request.image),
        )?;
        if let Some(audio_url) = audio_url {
            track.audio_url = audio_url;
        }
        if let Some(image_url) = image_url {
            track.image_url = image_url;
        }

        if let Some(title) = request.title.filter(|t| !t.is_empty()) {
            track.title = title;
        }
        if let Some(artist) = request.artist.filter(|a| !a.is_empty()) {
            track.artist = artist;
        }
        if let Some(duration_secs) = request.duration_secs.filter(|d| *d > 0) {
            track.duration_secs = duration_secs;
        }

        self.store.update_track(&track)?;
        Ok(track)
    }

    // =========================================================================
    // Collection mutations
    // =========================================================================

    /// Create a collection with an empty member set. The cover image is
    /// required; its upload failure aborts before persistence.
    pub async fn create_collection(
        &self,
        _key: &AdminKey,
        request: CreateCollectionRequest,
    ) -> CatalogResult<Collection> {
        let image = request.image.ok_or(CatalogError::MissingAsset("image_file"))?;

        let image_url = self.blobs.upload(&image).await?;

        let collection = self.store.insert_collection(NewCollection {
            title: request.title,
            artist: request.artist,
            image_url,
            release_year: request.release_year,
        })?;

        info!("Created collection {} ({})", collection.id, collection.title);
        Ok(collection)
    }

    /// Delete a collection, cascading to every member track first. Deleting
    /// an id that does not exist is success: the cascade matches zero tracks
    /// and the collection delete matches zero rows.
    pub async fn delete_collection(&self, _key: &AdminKey, id: &str) -> CatalogResult<()> {
        let deleted_tracks = self
            .store
            .delete_tracks_in_collection(id)
            .map_err(CatalogError::Store)?;
        self.store.delete_collection(id).map_err(CatalogError::Store)?;

        info!("Deleted collection {} ({} tracks)", id, deleted_tracks);
        Ok(())
    }

    /// Edit a collection's cover and/or scalar fields. Members are untouched.
    pub async fn edit_collection(
        &self,
        _key: &AdminKey,
        id: &str,
        request: EditCollectionRequest,
    ) -> CatalogResult<Collection> {
        let mut collection = match self.store.get_collection(id)? {
            Some(collection) => collection,
            None => {
                return Err(CatalogError::NotFound {
                    kind: "collection",
                    id: id.to_string(),
                })
            }
        };

        if let Some(image) = &request.image {
            collection.image_url = self.blobs.upload(image).await?;
        }

        if let Some(title) = request.title.filter(|t| !t.is_empty()) {
            collection.title = title;
        }
        if let Some(artist) = request.artist.filter(|a| !a.is_empty()) {
            collection.artist = artist;
        }
        if let Some(release_year) = request.release_year.filter(|y| *y > 0) {
            collection.release_year = release_year;
        }

        self.store.update_collection(&collection)?;
        Ok(collection)
    }

    // =========================================================================
    // Query surface
    // =========================================================================

    /// All tracks, most recently created first.
    pub fn list_tracks(&self) -> CatalogResult<Vec<Track>> {
        Ok(self.store.list_tracks()?)
    }

    /// `min(n, total)` tracks drawn without replacement, display fields only.
    pub fn sample_tracks(&self, n: usize) -> CatalogResult<Vec<TrackHighlight>> {
        Ok(self.store.sample_tracks(n)?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn get_track_or_not_found(&self, id: &str) -> CatalogResult<Track> {
        match self.store.get_track(id)? {
            Some(track) => Ok(track),
            None => Err(CatalogError::NotFound {
                kind: "track",
                id: id.to_string(),
            }),
        }
    }

    /// Best-effort secondary write: the track row is already durable when
    /// this runs. A failure here is the documented reconciliation gap; it is
    /// logged for offline repair and returned to the caller as a warning.
    fn append_member_best_effort(&self, collection_id: &str, track_id: &str) -> Result<(), String> {
        match self.store.add_member(collection_id, track_id) {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(
                    target: "reconciliation",
                    track_id, collection_id, error = %err,
                    "track created but not appended to collection members"
                );
                Err(format!(
                    "track created but not added to collection {}: {}",
                    collection_id, err
                ))
            }
        }
    }
}
