//! HTTP surface over the catalog engine.
//!
//! Handlers decode multipart bodies into engine requests and map
//! `CatalogError` to status codes through a single boundary helper. The 10MB
//! per-file ceiling is enforced here, before anything reaches the engine.

use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::error;

use crate::blob_store::BlobPayload;
use crate::catalog_store::Track;
use crate::engine::{
    CatalogEngine, CatalogError, CreateCollectionRequest, CreateTrackRequest,
    EditCollectionRequest, EditTrackRequest,
};
use tower_http::services::ServeDir;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;

use super::access::AdminAccess;
use super::{log_requests, state::*, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub tracks: usize,
    pub collections: usize,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct TrackCreatedResponse {
    #[serde(flatten)]
    track: Track,
    #[serde(skip_serializing_if = "Option::is_none")]
    membership_warning: Option<String>,
}

/// Single boundary mapping from engine errors to HTTP responses. Caller
/// errors keep their message; dependency failures are logged and, in
/// production mode, replaced with a generic message.
fn catalog_error_response(err: CatalogError, config: &ServerConfig) -> Response {
    let status = match &err {
        CatalogError::MissingAsset(_) => StatusCode::BAD_REQUEST,
        CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
        CatalogError::Ingestion(_) | CatalogError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = if status.is_server_error() {
        error!("Catalog operation failed: {}", err);
        if config.production_errors {
            "Internal server error".to_string()
        } else {
            err.to_string()
        }
    } else {
        err.to_string()
    };

    (status, Json(ErrorResponse { error: message })).into_response()
}

// =============================================================================
// Multipart decoding
// =============================================================================

const AUDIO_FIELD: &str = "audio_file";
const IMAGE_FIELD: &str = "image_file";

#[derive(Default)]
struct UploadForm {
    text: HashMap<String, String>,
    audio: Option<BlobPayload>,
    image: Option<BlobPayload>,
}

impl UploadForm {
    fn text(&self, name: &str) -> Option<String> {
        self.text.get(name).cloned()
    }

    fn text_or_default(&self, name: &str) -> String {
        self.text(name).unwrap_or_default()
    }

    fn int(&self, name: &str) -> Option<i64> {
        self.text.get(name).and_then(|v| v.trim().parse().ok())
    }
}

enum FormError {
    FileTooLarge { field: String, size: u64, max: u64 },
    Unreadable(StatusCode, String),
}

impl IntoResponse for FormError {
    fn into_response(self) -> Response {
        match self {
            FormError::FileTooLarge { field, size, max } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(ErrorResponse {
                    error: format!("{} too large: {} bytes (max: {})", field, size, max),
                }),
            )
                .into_response(),
            FormError::Unreadable(status, message) => {
                (status, Json(ErrorResponse { error: message })).into_response()
            }
        }
    }
}

async fn read_upload_form(
    mut multipart: Multipart,
    max_file_size: u64,
) -> Result<UploadForm, FormError> {
    let mut form = UploadForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(FormError::Unreadable(e.status(), e.body_text())),
        };

        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            AUDIO_FIELD | IMAGE_FIELD => {
                let filename = field.file_name().unwrap_or(&field_name).to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| FormError::Unreadable(e.status(), e.body_text()))?;
                if bytes.len() as u64 > max_file_size {
                    return Err(FormError::FileTooLarge {
                        field: field_name,
                        size: bytes.len() as u64,
                        max: max_file_size,
                    });
                }
                let payload = BlobPayload::new(filename, bytes.to_vec());
                if field_name == AUDIO_FIELD {
                    form.audio = Some(payload);
                } else {
                    form.image = Some(payload);
                }
            }
            _ => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| FormError::Unreadable(e.status(), e.body_text()))?;
                form.text.insert(
                    field_name,
                    String::from_utf8_lossy(&bytes).into_owned(),
                );
            }
        }
    }

    Ok(form)
}

// =============================================================================
// Handlers
// =============================================================================

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        tracks: state.catalog_store.tracks_count(),
        collections: state.catalog_store.collections_count(),
    };
    Json(stats)
}

async fn create_track(
    access: AdminAccess,
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Response {
    let form = match read_upload_form(multipart, state.config.max_file_size).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };

    let request = CreateTrackRequest {
        title: form.text_or_default("title"),
        artist: form.text_or_default("artist"),
        duration_secs: form.int("duration").unwrap_or(0),
        collection_id: form.text("collection_id"),
        audio: form.audio,
        image: form.image,
    };

    match state.engine.create_track(&access.key, request).await {
        Ok(created) => (
            StatusCode::CREATED,
            Json(TrackCreatedResponse {
                track: created.track,
                membership_warning: created.membership_warning,
            }),
        )
            .into_response(),
        Err(e) => catalog_error_response(e, &state.config),
    }
}

async fn edit_track(
    access: AdminAccess,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let form = match read_upload_form(multipart, state.config.max_file_size).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };

    let request = EditTrackRequest {
        title: form.text("title"),
        artist: form.text("artist"),
        duration_secs: form.int("duration"),
        collection_id: form.text("collection_id"),
        audio: form.audio,
        image: form.image,
    };

    match state.engine.edit_track(&access.key, &id, request).await {
        Ok(track) => Json(track).into_response(),
        Err(e) => catalog_error_response(e, &state.config),
    }
}

async fn delete_track(
    access: AdminAccess,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Response {
    match state.engine.delete_track(&access.key, &id).await {
        Ok(()) => Json(serde_json::json!({ "message": "Track deleted" })).into_response(),
        Err(e) => catalog_error_response(e, &state.config),
    }
}

async fn create_collection(
    access: AdminAccess,
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Response {
    let form = match read_upload_form(multipart, state.config.max_file_size).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };

    let request = CreateCollectionRequest {
        title: form.text_or_default("title"),
        artist: form.text_or_default("artist"),
        release_year: form.int("release_year").unwrap_or(0),
        image: form.image,
    };

    match state.engine.create_collection(&access.key, request).await {
        Ok(collection) => (StatusCode::CREATED, Json(collection)).into_response(),
        Err(e) => catalog_error_response(e, &state.config),
    }
}

async fn edit_collection(
    access: AdminAccess,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let form = match read_upload_form(multipart, state.config.max_file_size).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };

    let request = EditCollectionRequest {
        title: form.text("title"),
        artist: form.text("artist"),
        release_year: form.int("release_year"),
        image: form.image,
    };

    match state.engine.edit_collection(&access.key, &id, request).await {
        Ok(collection) => Json(collection).into_response(),
        Err(e) => catalog_error_response(e, &state.config),
    }
}

async fn delete_collection(
    access: AdminAccess,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Response {
    match state.engine.delete_collection(&access.key, &id).await {
        Ok(()) => Json(serde_json::json!({ "message": "Collection deleted" })).into_response(),
        Err(e) => catalog_error_response(e, &state.config),
    }
}

async fn list_tracks(_access: AdminAccess, State(state): State<ServerState>) -> Response {
    match state.engine.list_tracks() {
        Ok(tracks) => Json(tracks).into_response(),
        Err(e) => catalog_error_response(e, &state.config),
    }
}

async fn sample_response(state: &ServerState, n: usize) -> Response {
    match state.engine.sample_tracks(n) {
        Ok(tracks) => Json(tracks).into_response(),
        Err(e) => catalog_error_response(e, &state.config),
    }
}

async fn featured_tracks(State(state): State<ServerState>) -> Response {
    sample_response(&state, 6).await
}

async fn made_for_you_tracks(State(state): State<ServerState>) -> Response {
    sample_response(&state, 4).await
}

async fn trending_tracks(State(state): State<ServerState>) -> Response {
    sample_response(&state, 4).await
}

// =============================================================================
// App wiring
// =============================================================================

pub fn make_app(
    config: ServerConfig,
    engine: Arc<CatalogEngine>,
    catalog_store: GuardedCatalogStore,
    media_dir: PathBuf,
) -> Result<Router> {
    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        engine,
        catalog_store,
        hash: env!("GIT_HASH").to_string(),
    };

    let track_routes: Router = Router::new()
        .route("/", post(create_track).get(list_tracks))
        .route(
            "/{id}",
            put(edit_track).patch(edit_track).delete(delete_track),
        )
        .route("/featured", get(featured_tracks))
        .route("/made-for-you", get(made_for_you_tracks))
        .route("/trending", get(trending_tracks))
        .with_state(state.clone());

    let collection_routes: Router = Router::new()
        .route("/", post(create_collection))
        .route(
            "/{id}",
            put(edit_collection)
                .patch(edit_collection)
                .delete(delete_collection),
        )
        .with_state(state.clone());

    // Two full-size files plus scalar fields have to fit in one body.
    let body_limit = (config.max_file_size as usize) * 2 + 1024 * 1024;

    let app: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/tracks", track_routes)
        .nest("/collections", collection_routes)
        .nest_service("/media", ServeDir::new(media_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(state, log_requests));

    Ok(app)
}

pub async fn run_server(
    config: ServerConfig,
    engine: Arc<CatalogEngine>,
    catalog_store: GuardedCatalogStore,
    media_dir: PathBuf,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, engine, catalog_store, media_dir)?;

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;

    Ok(axum::serve(listener, app).await?)
}
