//! Client-facing error taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Missing key")]
    MissingCredential,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid file")]
    InvalidPayload,

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Missing parameters")]
    MissingParameters,

    #[error("File not found")]
    NotFound,

    #[error("Hash mismatch")]
    IntegrityMismatch,

    /// Infrastructure failure. Surfaced as a generic 500, never retried.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCredential | Self::InvalidPayload | Self::MissingParameters => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized | Self::IntegrityMismatch => StatusCode::FORBIDDEN,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Storage(e) => {
                tracing::error!("Storage failure: {}", e);
                (status, "Internal Server Error").into_response()
            }
            other => (status, other.to_string()).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_reference_statuses_and_bodies() {
        let cases = [
            (GatewayError::MissingCredential, 400, "Missing key"),
            (GatewayError::Unauthorized, 403, "Unauthorized"),
            (GatewayError::InvalidPayload, 400, "Invalid file"),
            (GatewayError::PayloadTooLarge, 413, "Payload too large"),
            (GatewayError::MissingParameters, 400, "Missing parameters"),
            (GatewayError::NotFound, 404, "File not found"),
            (GatewayError::IntegrityMismatch, 403, "Hash mismatch"),
        ];
        for (err, status, body) in cases {
            assert_eq!(err.status().as_u16(), status);
            assert_eq!(err.to_string(), body);
        }
    }

    #[test]
    fn test_storage_errors_are_500() {
        let err = GatewayError::from(StoreError::Task("join failed".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
