//! Mapping of request failures onto HTTP status codes

use super::value::ValueError;
use crate::actuator::DeliveryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Segment is not a digit string, same as a routing miss
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    InvalidValue(ValueError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl From<ValueError> for ApiError {
    fn from(e: ValueError) -> Self {
        match e {
            ValueError::NotDigits => ApiError::NotFound,
            other => ApiError::InvalidValue(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::InvalidValue(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
            ApiError::Delivery(e) => {
                warn!("[HTTP] {}", e);
                let status = match e {
                    DeliveryError::Closed(_) => StatusCode::SERVICE_UNAVAILABLE,
                    DeliveryError::Actuator { .. } => StatusCode::BAD_GATEWAY,
                };
                (status, e.to_string()).into_response()
            }
        }
    }
}
