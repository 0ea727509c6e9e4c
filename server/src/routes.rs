use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::blobs::routes as blob_routes;
use crate::state::AppState;

/// Default request body cap in megabytes.
pub const DEFAULT_MAX_UPLOAD_SIZE_MB: u32 = 100;

/// Build the axum Router with all routes and middleware.
///
/// Uploads are rate limited per peer IP when `state.upload_rate_limit` is
/// set. The limiter keys on `ConnectInfo<SocketAddr>`, so serve the router
/// with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state
        .max_upload_size_mb
        .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE_MB) as usize
        * 1024
        * 1024;

    let upload_route = post(blob_routes::upload);
    let upload_route = match state.upload_rate_limit.as_ref() {
        Some(limit) => {
            let governor_config = GovernorConfigBuilder::default()
                .key_extractor(PeerIpKeyExtractor)
                .per_second(limit.per_second)
                .burst_size(limit.burst_size)
                .finish();
            match governor_config {
                Some(config) => {
                    let config = Arc::new(config);

                    // Spawn background task to clean up rate limiter state
                    let limiter = config.limiter().clone();
                    tokio::spawn(async move {
                        loop {
                            tokio::time::sleep(Duration::from_secs(60)).await;
                            limiter.retain_recent();
                        }
                    });

                    upload_route.layer(GovernorLayer { config })
                }
                None => {
                    tracing::warn!(
                        "Invalid upload rate limit (per_second={}, burst_size={}), uploads are not rate limited",
                        limit.per_second,
                        limit.burst_size
                    );
                    upload_route
                }
            }
        }
        None => upload_route,
    };

    // GET and POST share the root path; only the POST half is rate limited.
    let blob_route = upload_route.get(blob_routes::download);

    Router::new()
        .route("/", blob_route)
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
