//! Multipart ingestion: stream the request body to disk, one file per part.
//!
//! The parser consumes a *generic* byte stream rather than a framework
//! extractor: the server hands over `Body::into_data_stream()` and this
//! module bridges it into [`multer`], which pulls chunks on demand. Anything
//! that yields `Result<impl Into<Bytes>, E>` works, which is also what makes
//! the stage unit-testable from hand-built chunk sequences.
//!
//! Stored filenames are `<millis>-<seq>-<original>`: a timestamp for
//! humans scanning the directory, plus a process-wide monotonic counter so
//! two requests landing in the same millisecond cannot collide. The upload
//! directory itself needs no locking.

use crate::config::PredictionConfig;
use crate::error::PredictError;
use crate::question::UploadedFile;
use bytes::Bytes;
use futures::Stream;
use multer::{Constraints, Multipart, SizeLimit};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Monotonic per-process sequence for stored-filename uniqueness.
static UPLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

/// Parse a multipart body and persist every file part to the upload dir.
///
/// All parts carrying a filename are collected, in order, regardless of how
/// many share one field name. Parts without a filename (plain form values)
/// are drained and ignored.
///
/// # Errors
/// Any parser failure, I/O failure, or breach of the configured size
/// ceiling aborts ingestion with [`PredictError::FormParse`]; files already
/// written for this request are removed first, so no partial records escape.
///
/// # Ownership
/// On success the returned records own files on disk; deleting them via
/// [`cleanup`] is the caller's obligation on every exit path.
pub async fn ingest_multipart<S, B, E>(
    stream: S,
    boundary: &str,
    config: &PredictionConfig,
) -> Result<Vec<UploadedFile>, PredictError>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: Into<Bytes> + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let constraints = Constraints::new()
        .size_limit(SizeLimit::new().whole_stream(config.max_body_bytes));
    let mut multipart = Multipart::with_constraints(stream, boundary, constraints);

    let mut files: Vec<UploadedFile> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                cleanup(&files).await;
                return Err(PredictError::FormParse {
                    reason: e.to_string(),
                });
            }
        };

        let Some(original_name) = field.file_name().map(sanitize_filename) else {
            // Plain form value; next_field() drains it.
            continue;
        };
        let media_type = field
            .content_type()
            .map(|m| m.to_string())
            .unwrap_or_default();

        match store_field(field, &original_name, &config.upload_dir).await {
            Ok((path, size_bytes)) => {
                debug!(
                    path = %path.display(),
                    size_bytes,
                    media_type = %media_type,
                    "stored upload part"
                );
                files.push(UploadedFile {
                    path,
                    original_name,
                    media_type,
                    size_bytes,
                });
            }
            Err(reason) => {
                cleanup(&files).await;
                return Err(PredictError::FormParse { reason });
            }
        }
    }

    Ok(files)
}

/// Write one field's chunks to a uniquely-named file in `dir`.
async fn store_field(
    mut field: multer::Field<'_>,
    original_name: &str,
    dir: &Path,
) -> Result<(std::path::PathBuf, u64), String> {
    let token = unique_token();
    let path = dir.join(format!("{token}-{original_name}"));

    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|e| format!("failed to create '{}': {e}", path.display()))?;

    let mut size_bytes: u64 = 0;
    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                size_bytes += chunk.len() as u64;
                if let Err(e) = file.write_all(&chunk).await {
                    drop(file);
                    remove_stored(&path).await;
                    return Err(format!("failed to write '{}': {e}", path.display()));
                }
            }
            Ok(None) => break,
            Err(e) => {
                drop(file);
                remove_stored(&path).await;
                return Err(e.to_string());
            }
        }
    }

    file.flush()
        .await
        .map_err(|e| format!("failed to flush '{}': {e}", path.display()))?;

    Ok((path, size_bytes))
}

/// Delete every stored file, logging failures without propagating them.
///
/// Deletion trouble must never mask the request's primary result; it is
/// reported and swallowed here.
pub async fn cleanup(files: &[UploadedFile]) {
    for f in files {
        remove_stored(&f.path).await;
    }
}

async fn remove_stored(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "failed to delete uploaded temp file");
    }
}

/// `<millis>-<seq>` — unique for the life of the process.
fn unique_token() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let seq = UPLOAD_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{millis}-{seq}")
}

/// Strip any path components from a client-supplied filename.
fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if base.is_empty() {
        "unknown".to_string()
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::convert::Infallible;

    const BOUNDARY: &str = "X-TEST-BOUNDARY";

    fn part(field_name: &str, filename: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        out.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field_name}\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        out.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\r\n");
        out
    }

    fn closing() -> Vec<u8> {
        format!("--{BOUNDARY}--\r\n").into_bytes()
    }

    fn body_stream(
        chunks: Vec<Vec<u8>>,
    ) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c))))
    }

    fn test_config(dir: &Path) -> PredictionConfig {
        PredictionConfig::builder()
            .upload_dir(dir)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn collects_every_file_part_under_one_field_name() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let mut body = part("files", "a.pdf", "application/pdf", b"%PDF-1.7 aaa");
        body.extend(part("files", "b.pdf", "application/pdf", b"%PDF-1.7 bbb"));
        body.extend(closing());

        let files = ingest_multipart(body_stream(vec![body]), BOUNDARY, &config)
            .await
            .unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].original_name, "a.pdf");
        assert_eq!(files[1].original_name, "b.pdf");
        assert_eq!(files[0].media_type, "application/pdf");
        assert_eq!(files[0].size_bytes, 12);
        for f in &files {
            assert!(f.path.exists());
            assert!(f.path.starts_with(dir.path()));
        }

        cleanup(&files).await;
        assert!(!files[0].path.exists());
        assert!(!files[1].path.exists());
    }

    #[tokio::test]
    async fn stored_names_are_prefixed_and_unique() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let mut body = part("files", "same.pdf", "application/pdf", b"one");
        body.extend(part("files", "same.pdf", "application/pdf", b"two"));
        body.extend(closing());

        let files = ingest_multipart(body_stream(vec![body]), BOUNDARY, &config)
            .await
            .unwrap();

        assert_eq!(files.len(), 2);
        assert_ne!(files[0].path, files[1].path);
        for f in &files {
            let name = f.path.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.ends_with("-same.pdf"), "got: {name}");
            assert_ne!(name, "same.pdf");
        }
        cleanup(&files).await;
    }

    #[tokio::test]
    async fn plain_form_values_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n");
        body.extend(part("files", "a.pdf", "application/pdf", b"%PDF"));
        body.extend(closing());

        let files = ingest_multipart(body_stream(vec![body]), BOUNDARY, &config)
            .await
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].original_name, "a.pdf");
        cleanup(&files).await;
    }

    #[tokio::test]
    async fn body_may_arrive_in_many_small_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let mut body = part("files", "a.pdf", "application/pdf", b"0123456789");
        body.extend(closing());
        let chunks: Vec<Vec<u8>> = body.chunks(7).map(|c| c.to_vec()).collect();

        let files = ingest_multipart(body_stream(chunks), BOUNDARY, &config)
            .await
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size_bytes, 10);
        assert_eq!(std::fs::read(&files[0].path).unwrap(), b"0123456789");
        cleanup(&files).await;
    }

    #[tokio::test]
    async fn size_ceiling_aborts_and_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = PredictionConfig::builder()
            .upload_dir(dir.path())
            .max_body_bytes(64)
            .build()
            .unwrap();

        let mut body = part("files", "big.pdf", "application/pdf", &[0u8; 4096]);
        body.extend(closing());

        let err = ingest_multipart(body_stream(vec![body]), BOUNDARY, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, PredictError::FormParse { .. }), "got: {err:?}");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn malformed_body_aborts_and_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        // A valid part followed by a truncated body with no closing boundary.
        let body = part("files", "a.pdf", "application/pdf", b"%PDF");

        let err = ingest_multipart(body_stream(vec![body]), BOUNDARY, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, PredictError::FormParse { .. }), "got: {err:?}");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("exam.pdf"), "exam.pdf");
        assert_eq!(sanitize_filename(""), "unknown");
        assert_eq!(sanitize_filename(".."), "unknown");
    }

    #[test]
    fn tokens_are_unique() {
        let a = unique_token();
        let b = unique_token();
        assert_ne!(a, b);
    }
}
