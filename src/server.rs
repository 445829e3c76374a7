//! HTTP surface: the `/api/predict` endpoint and server bootstrap.
//!
//! The predict handler deliberately takes the raw request [`Body`] instead
//! of a framework multipart extractor: the body's data stream is handed to
//! [`crate::pipeline::ingest`] together with the boundary parsed from the
//! `Content-Type` header, keeping size enforcement and file materialisation
//! in the pipeline where they are testable without HTTP plumbing.

use crate::config::PredictionConfig;
use crate::error::PredictError;
use crate::model::TextModel;
use crate::predict;
use crate::question::PredictedQuestion;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared state: the injected configuration and the resolved model client.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PredictionConfig>,
    pub model: Arc<dyn TextModel>,
}

/// Success payload of `POST /api/predict`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub questions: Vec<PredictedQuestion>,
}

/// Error payload for every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Build the application router.
///
/// Resolves the model client once up front; per-request state is limited to
/// the pipeline's own temporary files.
pub fn app(config: PredictionConfig) -> Result<Router, PredictError> {
    let model = predict::resolve_model(&config)?;
    let state = AppState {
        config: Arc::new(config),
        model,
    };

    Ok(Router::new()
        .route(
            "/api/predict",
            post(predict_handler)
                .get(method_not_allowed)
                .put(method_not_allowed),
        )
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Create the upload directory, bind, and serve until shutdown.
pub async fn serve(config: PredictionConfig, addr: SocketAddr) -> Result<(), std::io::Error> {
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    info!(upload_dir = %config.upload_dir.display(), "upload directory ready");

    let router = app(config).map_err(std::io::Error::other)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{addr}");
    axum::serve(listener, router).await
}

async fn predict_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<PredictResponse>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let boundary = multer::parse_boundary(content_type).map_err(|e| PredictError::FormParse {
        reason: format!("invalid content type: {e}"),
    })?;

    let output = predict::predict(
        body.into_data_stream(),
        &boundary,
        &state.config,
        state.model.as_ref(),
    )
    .await?;

    Ok(Json(PredictResponse {
        questions: output.questions,
    }))
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse {
            error: "Method Not Allowed. Use POST instead.".to_string(),
        }),
    )
        .into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Response-mapping wrapper around [`PredictError`].
struct ApiError(PredictError);

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            // Failures the uploading client caused with its request shape.
            PredictError::NoFiles | PredictError::UnsupportedMediaType { .. } => {
                StatusCode::BAD_REQUEST
            }
            // Everything else — including upstream-model unreliability the
            // client did not cause — is reported as a server error.
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        error!(status = %status, error = %self.0, "prediction request failed");

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        let resp = ApiError(PredictError::NoFiles).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ApiError(PredictError::UnsupportedMediaType {
            types: vec!["text/plain".into()],
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn pipeline_errors_map_to_500() {
        for err in [
            PredictError::FormParse { reason: "x".into() },
            PredictError::NoJsonArrayFound,
            PredictError::JsonParse { reason: "x".into() },
            PredictError::NotAnArray,
            PredictError::InvalidQuestionStructure { reason: "x".into() },
        ] {
            let resp = ApiError(err).into_response();
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
