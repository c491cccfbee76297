//! Test server lifecycle management
//!
//! Each test gets an isolated server on a random port with its own catalog
//! database and media directory.

use super::constants::*;
use super::fixtures::create_test_catalog_dirs;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tuneshelf_catalog_server::catalog_store::CatalogStore;
use tuneshelf_catalog_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use tuneshelf_catalog_server::{CatalogEngine, FsBlobStore, SqliteCatalogStore};

/// Test server instance with isolated catalog database and media directory
///
/// When dropped, the server shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Catalog store handle for direct state assertions in tests
    pub catalog_store: Arc<dyn CatalogStore>,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port with default test config
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawns a test server after letting the caller adjust the config
    pub async fn spawn_with(adjust: impl FnOnce(&mut ServerConfig)) -> Self {
        let (temp_dir, db_path, media_path) =
            create_test_catalog_dirs().expect("Failed to create test catalog dirs");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let catalog_store = Arc::new(
            SqliteCatalogStore::new(&db_path, 2).expect("Failed to open catalog store"),
        );

        let blob_store = Arc::new(FsBlobStore::new(
            &media_path,
            base_url.clone(),
            TEST_MAX_FILE_SIZE,
        ));
        blob_store
            .init()
            .await
            .expect("Failed to init media directory");

        let engine = Arc::new(CatalogEngine::new(catalog_store.clone(), blob_store));

        let mut config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            admin_key: TEST_ADMIN_KEY.to_string(),
            max_file_size: TEST_MAX_FILE_SIZE,
            production_errors: false,
        };
        adjust(&mut config);

        let app = make_app(
            config,
            engine,
            catalog_store.clone() as Arc<dyn CatalogStore>,
            media_path,
        )
        .expect("Failed to build app");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Test server crashed");
        });

        TestServer {
            base_url,
            catalog_store,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        }
    }
}
