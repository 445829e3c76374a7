//! Error types for the pdf2quiz library.
//!
//! Two distinct error types reflect two distinct failure scopes:
//!
//! * [`PredictError`] — a pipeline stage failed and the whole request is
//!   aborted. Returned from the top-level `predict*` functions and mapped to
//!   an HTTP status by the server layer.
//!
//! * [`ModelError`] — a failure inside a single generative-text provider
//!   call. Wrapped into [`PredictError::ModelInvocation`] once the invoker
//!   gives up. Kept separate so the retry loop can ask
//!   [`ModelError::is_transient`] whether another attempt is worth making.
//!
//! Cleanup failures are deliberately NOT a variant of either type: a
//! temporary file that could not be deleted is logged and swallowed, and must
//! never mask the primary result of the request.

use std::path::PathBuf;
use thiserror::Error;

/// All pipeline errors returned by the pdf2quiz library.
///
/// Every variant aborts the request; there are no partial results. The
/// server maps [`PredictError::NoFiles`] and
/// [`PredictError::UnsupportedMediaType`] to `400` and everything else to
/// `500`.
#[derive(Debug, Error)]
pub enum PredictError {
    // ── Upload errors ─────────────────────────────────────────────────────
    /// The multipart body could not be parsed or persisted to disk.
    #[error("Failed to parse uploaded form data: {reason}")]
    FormParse { reason: String },

    /// The request contained no uploaded files.
    #[error("No files uploaded.")]
    NoFiles,

    /// At least one uploaded file declared a media type other than
    /// `application/pdf`. Every offending type is listed.
    #[error("Unsupported file types uploaded ({}). Please upload PDF files only.", .types.join(", "))]
    UnsupportedMediaType { types: Vec<String> },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The generative-text invocation failed after all retries.
    #[error("Model invocation failed: {0}")]
    ModelInvocation(#[from] ModelError),

    // ── Response extraction errors ────────────────────────────────────────
    /// The model response contained no `[` … `]` bracketed region at all.
    #[error("No JSON array found in model response.")]
    NoJsonArrayFound,

    /// The recovered substring was not valid JSON.
    #[error("Failed to parse model response as JSON: {reason}")]
    JsonParse { reason: String },

    /// The recovered JSON parsed, but the top-level value is not an array.
    #[error("Parsed model response is not an array.")]
    NotAnArray,

    /// A parsed element failed the question schema check; the whole batch is
    /// rejected.
    #[error("Invalid structure in predicted questions: {reason}")]
    InvalidQuestionStructure { reason: String },
}

/// Errors from a single generative-text provider call.
#[derive(Debug, Error)]
pub enum ModelError {
    /// No API key was available for the configured provider.
    #[error("No API key configured. Set GEMINI_API_KEY or inject a model client.")]
    MissingApiKey,

    /// Reading an uploaded file into the request payload failed.
    #[error("Failed to read uploaded file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request never completed at the transport level.
    #[error("Transport error calling model API: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success HTTP status.
    #[error("Model API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The call exceeded the configured deadline.
    #[error("Model call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The provider answered 2xx but the completion carried no text.
    #[error("Model response contained no text candidates")]
    EmptyResponse,
}

impl ModelError {
    /// Whether a retry has a reasonable chance of succeeding.
    ///
    /// Transient: timeouts, transport failures, and 429/5xx statuses.
    /// Everything else (bad key, bad request, empty completion, local I/O)
    /// fails identically on retry and is surfaced immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            ModelError::Timeout { .. } => true,
            ModelError::Transport(e) => !e.is_builder(),
            ModelError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
