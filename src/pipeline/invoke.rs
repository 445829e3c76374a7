//! Model invocation: build the multi-part message and drive the call.
//!
//! This stage is intentionally thin — the instruction text lives in
//! [`crate::prompts`] and the wire encoding in [`crate::model`], so retry
//! and deadline policy here can change without touching either.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 5xx and transport blips are transient and worth retrying with
//! exponential backoff (`retry_backoff_ms * 2^attempt`): with a 500 ms base
//! and 2 retries the wait sequence is 500 ms → 1 s. Non-transient failures
//! (bad credentials, malformed request) surface immediately, and a model
//! that answers with unparsable text is never retried here — that is an
//! extraction failure, not a transport one. Every attempt runs under the
//! configured deadline so a hung upstream cannot pin the request task.

use crate::config::PredictionConfig;
use crate::error::{ModelError, PredictError};
use crate::model::{ModelRequest, TextModel};
use crate::question::UploadedFile;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// The raw completion of one successful model invocation.
#[derive(Debug)]
pub struct ModelReply {
    /// Opaque completion text; no structure assumed.
    pub text: String,
    /// Retries spent before the attempt that succeeded.
    pub retries: u32,
    /// Wall-clock time across all attempts.
    pub duration_ms: u64,
}

/// Build one request message from the validated uploads and await a single
/// text completion.
///
/// The message layout is fixed: the instruction text first, then one binary
/// part per file, bytes read fully into memory, media type defaulting to
/// `application/pdf` when the part declared none.
pub async fn invoke_model(
    model: &dyn TextModel,
    files: &[UploadedFile],
    config: &PredictionConfig,
) -> Result<ModelReply, PredictError> {
    let request = build_request(files, config).await?;
    let start = Instant::now();
    let deadline = Duration::from_secs(config.api_timeout_secs);

    let mut last_err: Option<ModelError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                attempt,
                max_retries = config.max_retries,
                backoff_ms = backoff,
                "retrying model call"
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let outcome = match timeout(deadline, model.generate(&request)).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout {
                secs: config.api_timeout_secs,
            }),
        };

        match outcome {
            Ok(text) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                debug!(chars = text.len(), retries = attempt, duration_ms, "model call complete");
                return Ok(ModelReply {
                    text,
                    retries: attempt,
                    duration_ms,
                });
            }
            Err(e) if e.is_transient() => {
                warn!(attempt, error = %e, "transient model failure");
                last_err = Some(e);
            }
            Err(e) => return Err(PredictError::ModelInvocation(e)),
        }
    }

    Err(PredictError::ModelInvocation(
        last_err.unwrap_or(ModelError::EmptyResponse),
    ))
}

/// Read every file into memory and assemble the ordered message parts.
async fn build_request(
    files: &[UploadedFile],
    config: &PredictionConfig,
) -> Result<ModelRequest, PredictError> {
    let mut request = ModelRequest::with_instruction(config.resolve_prompt());

    for file in files {
        let data = tokio::fs::read(&file.path)
            .await
            .map_err(|e| ModelError::FileRead {
                path: file.path.clone(),
                source: e,
            })?;
        let media_type = if file.media_type.is_empty() {
            crate::pipeline::validate::ALLOWED_MEDIA_TYPE.to_string()
        } else {
            file.media_type.clone()
        };
        request.push_file(media_type, data);
    }

    Ok(request)
}
