//! Pipeline stages for exam-question prediction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch model provider) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! ingest ──▶ validate ──▶ invoke ──▶ extract
//! (multipart)  (pdf-only)  (model)   (JSON recovery + schema check)
//! ```
//!
//! 1. [`ingest`]   — parse the multipart byte stream and write each part to
//!    the upload directory; owns the temporary-file lifecycle including
//!    [`ingest::cleanup`]
//! 2. [`validate`] — reject empty uploads and non-PDF media types; pure,
//!    never touches the filesystem
//! 3. [`invoke`]   — build the one multi-part model message and drive the
//!    call with deadline, retry, and backoff; the only stage with network I/O
//! 4. [`extract`]  — recover a JSON array from the free-form model text and
//!    schema-check every element
//!
//! Any stage failure aborts the whole request — transitions are forward-only
//! and there are no partial results.

pub mod extract;
pub mod ingest;
pub mod invoke;
pub mod validate;
