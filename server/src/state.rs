use std::sync::Arc;

use crate::blobs::BlobGateway;
use crate::config::RateLimitConfig;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Capability gate plus object store
    pub gateway: Arc<BlobGateway>,
    /// Request body cap in megabytes (default: 100)
    pub max_upload_size_mb: Option<u32>,
    /// Per-IP rate limit on uploads; `None` disables it
    pub upload_rate_limit: Option<RateLimitConfig>,
}
