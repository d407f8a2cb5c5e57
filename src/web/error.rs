// Errors surfaced by POST /predict and their HTTP mapping.
//
// 429 for throttled clients, 400 for anything the client can fix (missing,
// too short, too long or unreadable input), 500 for everything else. Server
// faults are logged with their full chain; the client only sees a generic
// message.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::pipeline::UnreadableDocument;
use crate::validate::Rejection;
use crate::web::api_error;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Too many requests: limit is {limit} per {window_secs} seconds, try again later")]
    RateLimited {
        limit: u32,
        window_secs: u64,
        retry_after: Duration,
    },
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error("Unreadable document: the uploaded {} could not be parsed", .0.format.name())]
    Unreadable(#[from] UnreadableDocument),
    #[error("Internal server error")]
    Fault(anyhow::Error),
}

impl PredictError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidInput(_) | Self::Rejected(_) | Self::Unreadable(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Fault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        match self {
            Self::RateLimited { retry_after, .. } => {
                let mut response = api_error(status, &message);
                // Round up so clients never retry a moment too early.
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                if let Ok(value) = HeaderValue::from_str(&secs.max(1).to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            Self::Unreadable(ref e) => {
                tracing::warn!(error = %e, "Rejected unreadable document");
                api_error(status, &message)
            }
            Self::Fault(ref e) => {
                tracing::error!(error = ?e, "Prediction failed");
                api_error(status, &message)
            }
            Self::InvalidInput(_) | Self::Rejected(_) => api_error(status, &message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let limited = PredictError::RateLimited {
            limit: 5,
            window_secs: 60,
            retry_after: Duration::from_secs(3),
        };
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            PredictError::from(Rejection::Empty).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PredictError::Fault(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_fault_message_hides_detail() {
        let err = PredictError::Fault(anyhow::anyhow!("artifact row 3 is corrupt"));
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn test_retry_after_header_rounds_up() {
        let response = PredictError::RateLimited {
            limit: 5,
            window_secs: 60,
            retry_after: Duration::from_millis(2_100),
        }
        .into_response();
        assert_eq!(response.headers()[header::RETRY_AFTER], "3");
    }
}
