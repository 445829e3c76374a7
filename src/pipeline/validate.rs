//! Upload validation: reject empty uploads and non-PDF media types.
//!
//! Pure functions over the ingested records — no filesystem access, no side
//! effects. Validation is all-or-nothing: one bad file fails the request.

use crate::error::PredictError;
use crate::question::UploadedFile;

/// The only media type the prediction model is asked to read.
pub const ALLOWED_MEDIA_TYPE: &str = "application/pdf";

/// Check the ingested upload set.
///
/// # Errors
/// * [`PredictError::NoFiles`] — the request carried no file parts.
/// * [`PredictError::UnsupportedMediaType`] — at least one file declared a
///   media type other than `application/pdf`; every offending declared type
///   is reported (duplicates included, in upload order).
pub fn validate_uploads(files: &[UploadedFile]) -> Result<(), PredictError> {
    if files.is_empty() {
        return Err(PredictError::NoFiles);
    }

    let offending: Vec<String> = files
        .iter()
        .filter(|f| f.media_type != ALLOWED_MEDIA_TYPE)
        .map(|f| {
            if f.media_type.is_empty() {
                "<none>".to_string()
            } else {
                f.media_type.clone()
            }
        })
        .collect();

    if !offending.is_empty() {
        return Err(PredictError::UnsupportedMediaType { types: offending });
    }

    Ok(())
}
