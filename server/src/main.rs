use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use blobgate_server::auth::capability::CapabilityGate;
use blobgate_server::blobs::digest::digest;
use blobgate_server::blobs::BlobGateway;
use blobgate_server::config::{generate_config_template, Config, StorageBackend};
use blobgate_server::routes;
use blobgate_server::state::AppState;
use blobgate_server::storage::{FsObjectStore, MemoryObjectStore, ObjectStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Handle --hash-key: print the digest to put in key_sha256 and exit
    if let Some(token) = config.hash_key.as_deref() {
        println!("{}", digest(token));
        return Ok(());
    }

    // Initialize tracing/logging
    let env_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("blobgate_server=info"))
    };
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(env_filter()).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(env_filter()).init();
    }

    tracing::info!("blobgate server v{} starting", env!("CARGO_PKG_VERSION"));

    // Capability digest is loaded once and never changes afterwards
    let gate = CapabilityGate::new(config.capability_digest()?);

    let storage = config.storage();
    let store: Arc<dyn ObjectStore> = match storage.backend {
        StorageBackend::Fs => Arc::new(FsObjectStore::open(&config.data_dir)?),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory object store, blobs are lost on restart");
            Arc::new(MemoryObjectStore::new())
        }
    };

    let upload_rate_limit = config.upload_rate_limit();
    if upload_rate_limit.is_none() {
        tracing::info!("Upload rate limiting disabled");
    }

    let app_state = AppState {
        gateway: Arc::new(BlobGateway::new(gate, store)),
        max_upload_size_mb: Some(storage.max_upload_size_mb),
        upload_rate_limit,
    };

    // Build router
    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
