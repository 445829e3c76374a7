//! Configuration for the prediction pipeline.
//!
//! All behaviour is controlled through one [`PredictionConfig`], built via
//! its [`PredictionConfigBuilder`], created once at process start and
//! injected into the server and pipeline. Keeping every knob in a single
//! injected struct (rather than module-level lazily-created state) makes the
//! upload directory, size ceiling, and naming strategy explicit and lets
//! tests run against an isolated temporary directory.

use crate::error::PredictError;
use crate::model::TextModel;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Environment variable selecting the model identifier.
pub const MODEL_ENV_VAR: &str = "GEMINI_MODEL";

/// Fallback model identifier used when neither the config field nor
/// [`MODEL_ENV_VAR`] supplies one.
pub const DEFAULT_MODEL: &str = "models/gemini-1.5-flash";

/// Default whole-request upload ceiling: 50 MiB.
pub const DEFAULT_MAX_BODY_BYTES: u64 = 50 * 1024 * 1024;

/// Configuration for a prediction request cycle.
///
/// Built via [`PredictionConfig::builder()`] or using
/// [`PredictionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2quiz::PredictionConfig;
///
/// let config = PredictionConfig::builder()
///     .upload_dir("tmp_uploads")
///     .model("models/gemini-1.5-pro")
///     .max_retries(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PredictionConfig {
    /// Directory where uploaded parts are written. Must exist before the
    /// first request; [`crate::server::serve`] creates it at startup.
    /// Default: `tmp_uploads`.
    pub upload_dir: PathBuf,

    /// Whole-stream size ceiling for one multipart body. Default: 50 MiB.
    ///
    /// Enforced by the multipart parser while the body streams in, so an
    /// oversized upload fails fast instead of filling the disk first.
    pub max_body_bytes: u64,

    /// Model identifier, e.g. `models/gemini-1.5-flash`.
    /// If `None`, the `GEMINI_MODEL` env var is consulted, then
    /// [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// API key for the model provider. If `None`, `GEMINI_API_KEY` is read
    /// from the environment when the client is constructed.
    pub api_key: Option<String>,

    /// Custom instruction prompt. If `None`, uses
    /// [`crate::prompts::DEFAULT_INSTRUCTION_PROMPT`].
    pub instruction_prompt: Option<String>,

    /// Pre-constructed model client. Takes precedence over `model`/`api_key`.
    /// This is the seam tests use to script model output.
    pub model_client: Option<Arc<dyn TextModel>>,

    /// Deadline for one model call in seconds. Default: 120.
    ///
    /// A prediction over several attached PDFs routinely takes tens of
    /// seconds; the deadline exists so a hung upstream cannot hold the
    /// request task open indefinitely.
    pub api_timeout_secs: u64,

    /// Maximum retry attempts on a transient model failure. Default: 2.
    ///
    /// Only transport errors, timeouts, and 429/5xx are retried. A model
    /// that answers with garbage text is NOT retried — malformed output is
    /// an extraction failure, not a transport one.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("tmp_uploads"),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            model: None,
            api_key: None,
            instruction_prompt: None,
            model_client: None,
            api_timeout_secs: 120,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl fmt::Debug for PredictionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictionConfig")
            .field("upload_dir", &self.upload_dir)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model_client", &self.model_client.as_ref().map(|_| "<dyn TextModel>"))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

impl PredictionConfig {
    /// Create a new builder for `PredictionConfig`.
    pub fn builder() -> PredictionConfigBuilder {
        PredictionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The effective model identifier: config field, then `GEMINI_MODEL`,
    /// then [`DEFAULT_MODEL`].
    pub fn resolve_model(&self) -> String {
        if let Some(ref m) = self.model {
            if !m.is_empty() {
                return m.clone();
            }
        }
        match std::env::var(MODEL_ENV_VAR) {
            Ok(m) if !m.is_empty() => m,
            _ => DEFAULT_MODEL.to_string(),
        }
    }

    /// The effective instruction prompt.
    pub fn resolve_prompt(&self) -> &str {
        self.instruction_prompt
            .as_deref()
            .unwrap_or(crate::prompts::DEFAULT_INSTRUCTION_PROMPT)
    }
}

/// Builder for [`PredictionConfig`].
#[derive(Debug)]
pub struct PredictionConfigBuilder {
    config: PredictionConfig,
}

impl PredictionConfigBuilder {
    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn max_body_bytes(mut self, bytes: u64) -> Self {
        self.config.max_body_bytes = bytes;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn instruction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.instruction_prompt = Some(prompt.into());
        self
    }

    pub fn model_client(mut self, client: Arc<dyn TextModel>) -> Self {
        self.config.model_client = Some(client);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PredictionConfig, PredictError> {
        let c = &self.config;
        if c.max_body_bytes == 0 {
            return Err(PredictError::FormParse {
                reason: "max_body_bytes must be ≥ 1".into(),
            });
        }
        if c.upload_dir.as_os_str().is_empty() {
            return Err(PredictError::FormParse {
                reason: "upload_dir must not be empty".into(),
            });
        }
        Ok(self.config)
    }
}
