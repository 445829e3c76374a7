//! Gemini `generateContent` wire client.
//!
//! Binary documents travel as base64 `inlineData` parts inside a single
//! user-role content — the only request shape the API accepts for
//! multi-document input without a separate upload step. The client performs
//! exactly one HTTP attempt per [`TextModel::generate`] call; retry and
//! deadline policy live in [`crate::pipeline::invoke`].

use crate::error::ModelError;
use crate::model::{ModelPart, ModelRequest, TextModel};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default API endpoint root.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variable holding the API credential.
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

// ── Wire types ───────────────────────────────────────────────────────────

/// Content container used in both requests and responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

/// Untagged union of text and inline media parts.
///
/// Variant order matters for `#[serde(untagged)]` decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// Base64 inline payload carrying an attached document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

/// Top-level `generateContent` response envelope.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

// ── Client ───────────────────────────────────────────────────────────────

/// Client for one Gemini model.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// Create a client for `model` with an explicit API key.
    ///
    /// `model` may be given with or without the `models/` prefix.
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        let model = model.into();
        let model = if model.starts_with("models/") {
            model
        } else {
            format!("models/{model}")
        };
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            api_key: api_key.into(),
        }
    }

    /// Create a client reading the API key from `GEMINI_API_KEY`.
    pub fn from_env(model: impl Into<String>) -> Result<Self, ModelError> {
        match std::env::var(API_KEY_ENV_VAR) {
            Ok(key) if !key.is_empty() => Ok(Self::new(model, key)),
            _ => Err(ModelError::MissingApiKey),
        }
    }

    /// Override the endpoint root (self-hosted gateways, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The fully-qualified model identifier this client targets.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn encode_request(request: &ModelRequest) -> GenerateContentRequest {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                ModelPart::Text(text) => Part::Text { text: text.clone() },
                ModelPart::File { media_type, data } => Part::InlineData {
                    inline_data: InlineData {
                        mime_type: media_type.clone(),
                        data: STANDARD.encode(data),
                    },
                },
            })
            .collect();

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
        }
    }

    fn decode_response(response: GenerateContentResponse) -> Result<String, ModelError> {
        let text: String = response
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| match p {
                        Part::Text { text } => Some(text),
                        Part::InlineData { .. } => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn generate(&self, request: &ModelRequest) -> Result<String, ModelError> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);
        let body = Self::encode_request(request);
        debug!(model = %self.model, parts = body.contents[0].parts.len(), "calling generateContent");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GenerateContentResponse = response.json().await?;
        Self::decode_response(envelope)
    }
}
