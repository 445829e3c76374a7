//! The generative-text seam: message types and the provider trait.
//!
//! The pipeline talks to exactly one abstraction, [`TextModel`]: ordered
//! multi-part input in, one completed text out. No streaming, no partial
//! results. The production implementation is [`gemini::GeminiClient`];
//! tests inject scripted doubles through
//! [`crate::config::PredictionConfig::model_client`].

pub mod gemini;

use crate::error::ModelError;
use async_trait::async_trait;

pub use gemini::GeminiClient;

/// One content part of a model request.
#[derive(Debug, Clone)]
pub enum ModelPart {
    /// Plain instruction text.
    Text(String),
    /// A binary document attached to the request.
    File {
        /// Declared media type, e.g. `application/pdf`.
        media_type: String,
        /// Raw file bytes; base64-encoded by the wire client.
        data: Vec<u8>,
    },
}

/// An ordered multi-part message for one model invocation.
///
/// The instruction text must precede the file parts; relative order among
/// the files is irrelevant.
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    pub parts: Vec<ModelPart>,
}

impl ModelRequest {
    /// A request starting with the given instruction text.
    pub fn with_instruction(text: impl Into<String>) -> Self {
        Self {
            parts: vec![ModelPart::Text(text.into())],
        }
    }

    /// Append a binary file part.
    pub fn push_file(&mut self, media_type: impl Into<String>, data: Vec<u8>) {
        self.parts.push(ModelPart::File {
            media_type: media_type.into(),
            data,
        });
    }
}

/// A generative-text invocation capability.
///
/// Takes an ordered multi-part message, returns the completion text of a
/// single synchronous generation. Implementations perform exactly one
/// attempt per call — retry and deadline policy belong to
/// [`crate::pipeline::invoke`], not here.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> Result<String, ModelError>;
}
