// POST /predict: classify an uploaded document or a JSON text field.
//
// Steps, each able to end the request early:
//   rate check (429) → read body → extract text (400 if unreadable)
//   → validate length (400) → classify (500 on fault) → 200
//
// The rate limiter lock is only held inside the rate check. Extraction and
// classification run on the blocking pool.

use std::net::SocketAddr;
use std::time::Instant;

use axum::body::to_bytes;
use axum::extract::{ConnectInfo, FromRequest, Multipart, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classifier::Classification;
use crate::extract::Upload;
use crate::pipeline::Submission;
use crate::rate_limit::Admission;
use crate::validate::validate;
use crate::web::error::PredictError;
use crate::web::identity::client_identity;
use crate::web::AppState;

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub ai_percent: f64,
    pub verdict: &'static str,
}

impl From<Classification> for PredictResponse {
    fn from(result: Classification) -> Self {
        Self {
            ai_percent: result.ai_percent(),
            verdict: result.verdict.label(),
        }
    }
}

pub async fn predict(State(state): State<AppState>, request: Request) -> Response {
    match run(&state, request).await {
        Ok(result) => (StatusCode::OK, Json(PredictResponse::from(result))).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn run(state: &AppState, request: Request) -> Result<Classification, PredictError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identity = client_identity(request.headers(), peer, state.config.trust_forwarded_for);

    if let Admission::Rejected { retry_after } = state.limiter.check(&identity, Instant::now()) {
        warn!(client = %identity, retry_after_secs = retry_after.as_secs(), "Rate limit exceeded");
        return Err(PredictError::RateLimited {
            limit: state.limiter.max_requests(),
            window_secs: state.limiter.window().as_secs(),
            retry_after,
        });
    }

    let submission = read_submission(request, state.config.max_upload_bytes).await?;

    let (text, source) = tokio::task::spawn_blocking(move || submission.resolve())
        .await
        .map_err(|e| PredictError::Fault(e.into()))??;

    validate(&text, &state.config.limits())?;

    let result = state
        .detector
        .classify(&text)
        .await
        .map_err(PredictError::Fault)?;

    info!(
        client = %identity,
        source = ?source,
        chars = text.trim().chars().count(),
        ai_percent = result.ai_percent(),
        verdict = %result.verdict,
        "Classified text"
    );
    Ok(result)
}

const TOO_LARGE: &str = "Upload is too large";

/// Read the inputs from a multipart form (`file`, `text`) or a JSON body.
async fn read_submission(request: Request, max_bytes: usize) -> Result<Submission, PredictError> {
    let declared_length = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    if declared_length.is_some_and(|length| length > max_bytes as u64) {
        return Err(PredictError::InvalidInput(TOO_LARGE.to_string()));
    }

    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    if is_multipart {
        read_multipart(request).await
    } else {
        read_json(request, max_bytes).await
    }
}

async fn read_multipart(request: Request) -> Result<Submission, PredictError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| PredictError::InvalidInput(format!("Invalid multipart body: {}", e.body_text())))?;

    let mut submission = Submission::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") if submission.file.is_none() => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                submission.file = Some(Upload::new(filename, bytes.to_vec()));
            }
            Some("text") if submission.text.is_none() => {
                submission.text = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }
    Ok(submission)
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> PredictError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PredictError::InvalidInput(TOO_LARGE.to_string())
    } else {
        PredictError::InvalidInput(format!("Failed to read upload: {}", e.body_text()))
    }
}

async fn read_json(request: Request, max_bytes: usize) -> Result<Submission, PredictError> {
    let body = to_bytes(request.into_body(), max_bytes)
        .await
        .map_err(|_| PredictError::InvalidInput(TOO_LARGE.to_string()))?;

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Submission::default());
    }

    let parsed: PredictRequest = serde_json::from_slice(&body).map_err(|_| {
        PredictError::InvalidInput(
            "Expected a multipart \"file\" upload or a JSON object with a \"text\" field"
                .to_string(),
        )
    })?;

    Ok(Submission {
        file: None,
        text: parsed.text,
    })
}
