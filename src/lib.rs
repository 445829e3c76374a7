//! # pdf2quiz
//!
//! Predict likely exam questions from uploaded PDF past papers using LLMs.
//!
//! ## Why this crate?
//!
//! Students revising from past papers want to know what is *likely to be
//! asked*, not just what *was* asked. This crate accepts PDF exam papers
//! over a multipart HTTP upload, hands them to a generative-text model in a
//! single multi-part message, and defensively recovers a structured list of
//! predicted questions from the model's free-form reply — tolerating code
//! fences, surrounding prose, and other output the prompt explicitly
//! forbade.
//!
//! ## Pipeline Overview
//!
//! ```text
//! multipart body
//!  │
//!  ├─ 1. Ingest    stream parts to the upload dir (multer, 50 MiB ceiling)
//!  ├─ 2. Validate  reject empty sets and non-PDF media types
//!  ├─ 3. Invoke    one instruction + one inlineData part per file (Gemini)
//!  ├─ 4. Extract   recover the JSON array; schema-check every element
//!  └─ 5. Cleanup   delete the temporary files on every exit path
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2quiz::{server, PredictionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Model picked from GEMINI_MODEL, key from GEMINI_API_KEY.
//!     let config = PredictionConfig::default();
//!     server::serve(config, "127.0.0.1:3000".parse()?).await?;
//!     Ok(())
//! }
//! ```
//!
//! Or without HTTP, over local files:
//!
//! ```rust,no_run
//! use pdf2quiz::{predict_files, resolve_model, PredictionConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PredictionConfig::default();
//! let model = resolve_model(&config)?;
//! let output = predict_files(&["past_paper.pdf"], &config, model.as_ref()).await?;
//! for q in &output.questions {
//!     println!("{}: {}", q.id, q.text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2quiz` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2quiz = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod predict;
pub mod prompts;
pub mod question;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PredictionConfig, PredictionConfigBuilder, DEFAULT_MODEL};
pub use error::{ModelError, PredictError};
pub use model::{GeminiClient, ModelPart, ModelRequest, TextModel};
pub use predict::{predict, predict_files, predict_uploads, resolve_model};
pub use question::{PredictedQuestion, PredictionOutput, PredictionStats, UploadedFile};
