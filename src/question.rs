//! Domain types: uploaded files, predicted questions, and prediction output.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One file materialised on disk by the multipart ingestor.
///
/// The record owns its temporary file exclusively: it is created when the
/// ingestor finishes writing the part and the file is deleted by
/// [`crate::pipeline::ingest::cleanup`] before the request's response is
/// sent. It must never outlive one request cycle.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Absolute path of the stored file inside the upload directory.
    pub path: PathBuf,
    /// Filename as declared by the client, `"unknown"` when absent.
    pub original_name: String,
    /// Media type as declared by the client part headers, may be empty.
    pub media_type: String,
    /// Bytes written to disk for this part.
    pub size_bytes: u64,
}

/// A single AI-predicted exam question.
///
/// `id` is kept as a raw JSON number so integer ids round-trip verbatim
/// (`1` stays `1`, not `1.0`). `text` may be empty — only its type is
/// checked. `dataTable`, when present, is
/// a markdown pipe table; its grammar is validated lazily by the rendering
/// collaborator, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedQuestion {
    pub id: serde_json::Number,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_table: Option<String>,
}

/// Timing and volume counters for one prediction cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionStats {
    /// Number of uploaded files sent to the model.
    pub files: usize,
    /// Total bytes across all uploaded files.
    pub upload_bytes: u64,
    /// Wall-clock time of the model invocation, including retries.
    pub model_duration_ms: u64,
    /// Wall-clock time of the whole pipeline run.
    pub total_duration_ms: u64,
    /// Retries spent before the model call succeeded.
    pub retries: u32,
}

/// Result of a successful prediction cycle.
///
/// The HTTP layer serialises only the `questions` list; `stats` is for
/// library callers and logs.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionOutput {
    pub questions: Vec<PredictedQuestion>,
    pub stats: PredictionStats,
}
