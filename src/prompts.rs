//! The instruction prompt sent ahead of the uploaded documents.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the requested output contract
//!    (field names, table semantics) requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can assert the prompt still demands the
//!    invariants the extractor relies on (pure JSON, array shape, no fences)
//!    without calling a real model.
//!
//! Callers can override the default via
//! [`crate::config::PredictionConfig::instruction_prompt`]; the constant here
//! is used only when no override is provided.

/// Default instruction prompt for exam-question prediction.
///
/// The prompt must keep demanding pure JSON with no fences or commentary:
/// the extractor tolerates violations, but every concession the model makes
/// here is recovery work downstream.
pub const DEFAULT_INSTRUCTION_PROMPT: &str = r#"Please analyze the content of the uploaded PDF documents and generate a list of potential exam questions in pure JSON format. The JSON should be an array of objects, each with the following structure:

{
  "id": number,
  "text": string,
  "dataTable": string // A markdown table that can be parsed, included only if the question has tabular data
}

Do not include any markdown, code fences, or additional text outside of the JSON. Ensure the JSON is valid and only contains the list of questions with their corresponding data tables."#;
