//! HTTP endpoints for blob upload and download.
//!
//! POST /?key=<token>: upload a blob (multipart field `file`)
//! GET /?fileId=<id>&hash=<sha256>: download a blob after verifying its digest

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        Multipart, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::auth::credential;
use crate::blobs::gateway::{StoredBlob, Upload, DEFAULT_CONTENT_TYPE};
use crate::error::GatewayError;
use crate::state::AppState;

/// Name of the multipart field carrying the file.
const FILE_FIELD: &str = "file";

/// Query string as ordered pairs. Repeated parameters are allowed; the first
/// occurrence wins.
#[derive(Debug, Default)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn from_extracted(query: Result<Query<Vec<(String, String)>>, QueryRejection>) -> Self {
        match query {
            Ok(Query(pairs)) => Self(pairs),
            Err(rejection) => {
                tracing::debug!("Unreadable query string: {}", rejection);
                Self::default()
            }
        }
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// POST /?key=<token>
///
/// The capability token comes from the `key` query parameter or, failing
/// that, an `Authorization: Bearer` header. It is checked before the body is
/// read. Responds with `{"uuid": ..., "hash": ...}`.
pub async fn upload(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<StoredBlob>, GatewayError> {
    let query = QueryParams::from_extracted(query);
    let token = credential::capability_token(query.first("key"), &headers);
    let grant = state.gateway.authorize_write(token.as_deref())?;

    let upload = match multipart {
        Ok(multipart) => read_file_part(multipart).await?,
        Err(rejection) => {
            tracing::debug!("Upload body is not multipart: {}", rejection);
            None
        }
    };

    let stored = state.gateway.persist(grant, upload).await?;
    Ok(Json(stored))
}

/// GET /?fileId=<id>&hash=<sha256>
///
/// Returns the raw bytes with the content type recorded at upload, or
/// `application/octet-stream`.
pub async fn download(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let query = QueryParams::from_extracted(query);
    let blob = state
        .gateway
        .retrieve(query.first("fileId"), query.first("hash"))
        .await?;

    let content_type = HeaderValue::from_str(&blob.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    Ok(([(header::CONTENT_TYPE, content_type)], blob.bytes))
}

/// Find the first `file` field. A `file` field that is a plain form value
/// rather than a file part does not count.
async fn read_file_part(mut multipart: Multipart) -> Result<Option<Upload>, GatewayError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        if field.file_name().is_none() {
            return Ok(None);
        }

        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(Some(Upload {
            bytes,
            content_type,
        }));
    }
    Ok(None)
}

fn multipart_error(e: MultipartError) -> GatewayError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::PayloadTooLarge
    } else {
        tracing::debug!("Malformed multipart body: {}", e);
        GatewayError::InvalidPayload
    }
}
