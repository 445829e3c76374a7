//! Prediction pipeline entry points.
//!
//! One request is one straight-line pipe — ingest, validate, invoke,
//! extract — with no branching retries at this level and no partial
//! results. Whatever happens after ingestion, every temporary file the
//! request created is deleted before the result is returned: acquisition in
//! [`crate::pipeline::ingest`], guaranteed release here on every exit path.

use crate::config::PredictionConfig;
use crate::error::PredictError;
use crate::model::{GeminiClient, TextModel};
use crate::pipeline::{extract, ingest, invoke, validate};
use crate::question::{PredictionOutput, PredictionStats, UploadedFile};
use bytes::Bytes;
use futures::Stream;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Run the full pipeline over a multipart body stream.
///
/// This is the primary entry point, used by the HTTP handler with the
/// request's raw byte stream and the boundary parsed from its
/// `Content-Type` header.
///
/// # Errors
/// Any stage failure aborts the request with the corresponding
/// [`PredictError`]; ingested files are deleted on success and on every
/// failure path alike.
pub async fn predict<S, B, E>(
    stream: S,
    boundary: &str,
    config: &PredictionConfig,
    model: &dyn TextModel,
) -> Result<PredictionOutput, PredictError>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: Into<Bytes> + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let total_start = Instant::now();

    // ── Step 1: Ingest uploads ───────────────────────────────────────────
    let files = ingest::ingest_multipart(stream, boundary, config).await?;
    debug!(files = files.len(), "ingested multipart body");

    // ── Steps 2–5 run with cleanup guaranteed afterwards ─────────────────
    let result = predict_uploads(&files, config, model).await;

    // ── Step 6: Cleanup, regardless of outcome ───────────────────────────
    ingest::cleanup(&files).await;

    result.map(|mut output| {
        output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
        output
    })
}

/// Run validation, invocation, and extraction over already-ingested files.
///
/// Does NOT delete the files — the caller owns their lifecycle. Library
/// users with their own PDFs on disk can call this (or [`predict_files`])
/// directly and keep their inputs.
pub async fn predict_uploads(
    files: &[UploadedFile],
    config: &PredictionConfig,
    model: &dyn TextModel,
) -> Result<PredictionOutput, PredictError> {
    let start = Instant::now();

    // ── Validate ─────────────────────────────────────────────────────────
    validate::validate_uploads(files)?;

    // ── Invoke the model ─────────────────────────────────────────────────
    let reply = invoke::invoke_model(model, files, config).await?;

    // ── Extract and schema-check ─────────────────────────────────────────
    let questions = extract::extract_questions(&reply.text)?;

    let stats = PredictionStats {
        files: files.len(),
        upload_bytes: files.iter().map(|f| f.size_bytes).sum(),
        model_duration_ms: reply.duration_ms,
        total_duration_ms: start.elapsed().as_millis() as u64,
        retries: reply.retries,
    };

    info!(
        questions = questions.len(),
        files = stats.files,
        model_duration_ms = stats.model_duration_ms,
        retries = stats.retries,
        "prediction complete"
    );

    Ok(PredictionOutput { questions, stats })
}

/// Predict questions from local PDF files, without HTTP or cleanup.
///
/// Each path is attached as `application/pdf`. Used by the CLI `predict`
/// subcommand; the input files are the caller's own and are never deleted.
pub async fn predict_files(
    paths: &[impl AsRef<Path>],
    config: &PredictionConfig,
    model: &dyn TextModel,
) -> Result<PredictionOutput, PredictError> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| PredictError::FormParse {
                reason: format!("cannot read '{}': {e}", path.display()),
            })?;
        files.push(UploadedFile {
            path: path.to_path_buf(),
            original_name: path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_string()),
            media_type: validate::ALLOWED_MEDIA_TYPE.to_string(),
            size_bytes: meta.len(),
        });
    }

    predict_uploads(&files, config, model).await
}

/// Resolve the model client, from most-specific to least-specific.
///
/// 1. **Injected client** (`config.model_client`) — the caller constructed
///    the provider entirely; used as-is. This is how tests script output.
/// 2. **Configured key + model** — a [`GeminiClient`] from `config.api_key`
///    (or the `GEMINI_API_KEY` environment variable) and
///    [`PredictionConfig::resolve_model`].
pub fn resolve_model(config: &PredictionConfig) -> Result<Arc<dyn TextModel>, PredictError> {
    if let Some(ref client) = config.model_client {
        return Ok(Arc::clone(client));
    }

    let model_id = config.resolve_model();
    let client = match config.api_key {
        Some(ref key) if !key.is_empty() => GeminiClient::new(model_id, key.clone()),
        _ => GeminiClient::from_env(model_id)?,
    };
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::model::ModelRequest;
    use async_trait::async_trait;
    use futures::stream;
    use std::convert::Infallible;

    struct ScriptedModel(String);

    #[async_trait]
    impl TextModel for ScriptedModel {
        async fn generate(&self, _request: &ModelRequest) -> Result<String, ModelError> {
            Ok(self.0.clone())
        }
    }

    const BOUNDARY: &str = "PIPE-TEST";

    fn pdf_body(n: usize) -> Vec<u8> {
        let mut body = Vec::new();
        for i in 0..n {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"files\"; filename=\"p{i}.pdf\"\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n%PDF-1.7\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn one_chunk(
        body: Vec<u8>,
    ) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        stream::iter(std::iter::once(Ok(Bytes::from(body))))
    }

    #[tokio::test]
    async fn full_pipeline_cleans_up_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let config = PredictionConfig::builder()
            .upload_dir(dir.path())
            .build()
            .unwrap();
        let model = ScriptedModel(r#"[{"id":1,"text":"Q1"}]"#.into());

        let out = predict(one_chunk(pdf_body(2)), BOUNDARY, &config, &model)
            .await
            .unwrap();
        assert_eq!(out.questions.len(), 1);
        assert_eq!(out.stats.files, 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn full_pipeline_cleans_up_on_extraction_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = PredictionConfig::builder()
            .upload_dir(dir.path())
            .build()
            .unwrap();
        let model = ScriptedModel("no questions here, sorry".into());

        let err = predict(one_chunk(pdf_body(1)), BOUNDARY, &config, &model)
            .await
            .unwrap_err();
        assert!(matches!(err, PredictError::NoJsonArrayFound));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_body_is_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = PredictionConfig::builder()
            .upload_dir(dir.path())
            .build()
            .unwrap();
        let model = ScriptedModel("[]".into());

        let err = predict(one_chunk(pdf_body(0)), BOUNDARY, &config, &model)
            .await
            .unwrap_err();
        assert!(matches!(err, PredictError::NoFiles));
    }

    #[tokio::test]
    async fn resolve_prefers_injected_client() {
        let config = PredictionConfig::builder()
            .model_client(Arc::new(ScriptedModel("[]".into())))
            .build()
            .unwrap();
        assert!(resolve_model(&config).is_ok());
    }

    #[tokio::test]
    async fn predict_files_keeps_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("course.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let config = PredictionConfig::default();
        let model = ScriptedModel(r#"[{"id":1,"text":"Q1"}]"#.into());
        let out = predict_files(&[&path], &config, &model).await.unwrap();

        assert_eq!(out.questions.len(), 1);
        assert!(path.exists(), "caller-owned input must not be deleted");
    }
}
