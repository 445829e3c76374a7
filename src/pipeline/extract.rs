//! Response extraction: recover a JSON question array from free-form model
//! text.
//!
//! Even well-prompted models routinely disobey "pure JSON, no fences": they
//! wrap the array in a ```` ```json ```` block, preface it with "Here is the
//! JSON:", or append a sign-off. The recovery here is a deliberately bounded
//! heuristic, applied in priority order:
//!
//! 1. Trim surrounding whitespace.
//! 2. A fenced block labelled `json` (case-insensitive) wins; everything
//!    outside it is discarded.
//! 3. If the text still does not start with `[`, take the first `[` through
//!    the last `]` inclusive.
//! 4. Parse as JSON; the top-level value must be an array.
//!
//! ## Known limitation
//!
//! The heuristic assumes at most one JSON array is present and that it is
//! the outermost bracketed structure. Prose containing unrelated `[` or `]`
//! characters before/after the intended array produces incorrect extraction.
//! That is the documented contract, not a bug: do not grow this into a
//! general JSON-in-text grammar.
//!
//! Extraction is deterministic and idempotent — running it on its own clean
//! output returns an identical array.

use crate::error::PredictError;
use crate::question::PredictedQuestion;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// ```` ```json … ``` ````, case-insensitive, non-greedy across lines.
static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```json\s*(.*?)```").unwrap());

/// Recover and schema-check the question array from raw model output.
///
/// # Errors
/// * [`PredictError::NoJsonArrayFound`] — no bracketed region exists.
/// * [`PredictError::JsonParse`] — the recovered substring is not JSON.
/// * [`PredictError::NotAnArray`] — it parsed to a non-array value.
/// * [`PredictError::InvalidQuestionStructure`] — any element failed the
///   schema check; the whole batch is rejected.
pub fn extract_questions(raw: &str) -> Result<Vec<PredictedQuestion>, PredictError> {
    let elements = recover_array(raw)?;
    check_questions(&elements)
}

/// Steps 1–4: locate and parse the array, without schema-checking elements.
pub fn recover_array(raw: &str) -> Result<Vec<Value>, PredictError> {
    let mut clean = raw.trim().to_string();

    if let Some(caps) = RE_JSON_FENCE.captures(&clean) {
        clean = caps[1].trim().to_string();
    }

    if !clean.starts_with('[') {
        match (clean.find('['), clean.rfind(']')) {
            (Some(first), Some(last)) if first < last => {
                clean = clean[first..=last].trim().to_string();
            }
            (Some(_), Some(_)) => {
                // Brackets exist but in the wrong order; let the parser
                // report the garbage rather than inventing a slice.
            }
            _ => return Err(PredictError::NoJsonArrayFound),
        }
    }

    let value: Value = serde_json::from_str(&clean).map_err(|e| PredictError::JsonParse {
        reason: e.to_string(),
    })?;

    match value {
        Value::Array(elements) => Ok(elements),
        _ => Err(PredictError::NotAnArray),
    }
}

/// Schema-check one parsed element.
///
/// The tagged result keeps the contract exact and testable: `Ok` carries the
/// constructed question, `Err` carries the reason the element was rejected.
/// Checks are type-only — `id` any JSON number, `text` any string (emptiness
/// allowed), `dataTable` absent or a string (`null` is NOT accepted). Extra
/// fields are ignored.
pub fn check_question(value: &Value) -> Result<PredictedQuestion, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| format!("element is not an object: {value}"))?;

    let id = match obj.get("id") {
        Some(Value::Number(n)) => n.clone(),
        other => return Err(format!("`id` must be a number, got {}", describe(other))),
    };

    let text = match obj.get("text") {
        Some(Value::String(s)) => s.clone(),
        other => return Err(format!("`text` must be a string, got {}", describe(other))),
    };

    let data_table = match obj.get("dataTable") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        other => {
            return Err(format!(
                "`dataTable` must be a string when present, got {}",
                describe(other)
            ))
        }
    };

    Ok(PredictedQuestion {
        id,
        text,
        data_table,
    })
}

/// All-or-nothing batch check: the first invalid element rejects the lot.
pub fn check_questions(elements: &[Value]) -> Result<Vec<PredictedQuestion>, PredictError> {
    elements
        .iter()
        .map(check_question)
        .collect::<Result<Vec<_>, String>>()
        .map_err(|reason| PredictError::InvalidQuestionStructure { reason })
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None => "nothing".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(_)) => "a boolean".to_string(),
        Some(Value::Number(_)) => "a number".to_string(),
        Some(Value::String(_)) => "a string".to_string(),
        Some(Value::Array(_)) => "an array".to_string(),
        Some(Value::Object(_)) => "an object".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(id: i64, text: &str) -> PredictedQuestion {
        PredictedQuestion {
            id: id.into(),
            text: text.into(),
            data_table: None,
        }
    }

    // ── Recovery ─────────────────────────────────────────────────────────

    #[test]
    fn bare_array_passes_through() {
        let out = extract_questions(r#"[{"id":1,"text":"Q1"}]"#).unwrap();
        assert_eq!(out, vec![q(1, "Q1")]);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let out = extract_questions("  \n\t[{\"id\":1,\"text\":\"Q1\"}]\n  ").unwrap();
        assert_eq!(out, vec![q(1, "Q1")]);
    }

    #[test]
    fn json_fence_wins_over_everything_outside() {
        let raw = "Sure! Here you go:\n```json\n[{\"id\":1,\"text\":\"Q1\",\"dataTable\":\"|a|b|\\n|-|-|\\n|1|2|\"}]\n```\nHope this helps [1].";
        let out = extract_questions(raw).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 1.into());
        assert_eq!(out[0].data_table.as_deref(), Some("|a|b|\n|-|-|\n|1|2|"));
    }

    #[test]
    fn fence_label_is_case_insensitive() {
        let raw = "```JSON\n[{\"id\":1,\"text\":\"Q1\"}]\n```";
        assert_eq!(extract_questions(raw).unwrap(), vec![q(1, "Q1")]);
    }

    #[test]
    fn leading_prose_is_bracket_scanned() {
        let raw = r#"Here is the JSON: [{"id":2,"text":"Q2"}] Thanks!"#;
        assert_eq!(extract_questions(raw).unwrap(), vec![q(2, "Q2")]);
    }

    #[test]
    fn no_brackets_at_all_fails() {
        let err = extract_questions("I could not find any questions.").unwrap_err();
        assert!(matches!(err, PredictError::NoJsonArrayFound));
    }

    #[test]
    fn missing_closing_bracket_fails() {
        let err = extract_questions(r#"here: [{"id":1,"text":"Q1"}"#).unwrap_err();
        assert!(matches!(err, PredictError::NoJsonArrayFound));
    }

    #[test]
    fn unparsable_substring_is_a_parse_error() {
        let err = extract_questions("data: [not json at all]").unwrap_err();
        assert!(matches!(err, PredictError::JsonParse { .. }));
    }

    #[test]
    fn non_array_json_fails() {
        let err = extract_questions(r#"{"id":1,"text":"Q1"}"#).unwrap_err();
        // An object that does not start with `[` and has no brackets at all.
        assert!(matches!(err, PredictError::NoJsonArrayFound));

        let err = extract_questions("```json\n{\"id\":1}\n```").unwrap_err();
        assert!(matches!(err, PredictError::NotAnArray));
    }

    #[test]
    fn empty_array_is_valid_and_empty() {
        assert_eq!(extract_questions("[]").unwrap(), vec![]);
    }

    #[test]
    fn extraction_is_idempotent_on_clean_output() {
        let raw = "Noise before [{\"id\":5,\"text\":\"Q5\"}] noise after";
        let first = extract_questions(raw).unwrap();
        let reserialised = serde_json::to_string(&first).unwrap();
        let second = extract_questions(&reserialised).unwrap();
        assert_eq!(first, second);
    }

    // ── Schema check ─────────────────────────────────────────────────────

    #[test]
    fn non_numeric_id_rejects_the_whole_batch() {
        let raw = r#"[{"id":1,"text":"ok"},{"id":"two","text":"bad"}]"#;
        let err = extract_questions(raw).unwrap_err();
        match err {
            PredictError::InvalidQuestionStructure { reason } => {
                assert!(reason.contains("`id`"), "got: {reason}");
            }
            other => panic!("expected InvalidQuestionStructure, got {other:?}"),
        }
    }

    #[test]
    fn missing_text_rejects() {
        let raw = r#"[{"id":1}]"#;
        assert!(matches!(
            extract_questions(raw).unwrap_err(),
            PredictError::InvalidQuestionStructure { .. }
        ));
    }

    #[test]
    fn null_data_table_rejects() {
        let raw = r#"[{"id":1,"text":"Q1","dataTable":null}]"#;
        assert!(matches!(
            extract_questions(raw).unwrap_err(),
            PredictError::InvalidQuestionStructure { .. }
        ));
    }

    #[test]
    fn empty_text_is_allowed() {
        let out = extract_questions(r#"[{"id":1,"text":""}]"#).unwrap();
        assert_eq!(out[0].text, "");
    }

    #[test]
    fn float_id_is_allowed() {
        let out = extract_questions(r#"[{"id":1.5,"text":"Q"}]"#).unwrap();
        assert_eq!(out[0].id.as_f64(), Some(1.5));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let out = extract_questions(r#"[{"id":1,"text":"Q1","difficulty":"hard"}]"#).unwrap();
        assert_eq!(out, vec![q(1, "Q1")]);
    }

    #[test]
    fn non_object_element_rejects() {
        let raw = r#"[42]"#;
        assert!(matches!(
            extract_questions(raw).unwrap_err(),
            PredictError::InvalidQuestionStructure { .. }
        ));
    }

    #[test]
    fn check_question_reports_reason() {
        let v: Value = serde_json::json!({"id": true, "text": "Q"});
        let reason = check_question(&v).unwrap_err();
        assert!(reason.contains("a boolean"), "got: {reason}");
    }
}
