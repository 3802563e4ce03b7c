//! Parsing and validation of scoring responses.
//!
//! A response is accepted only if it contains a JSON object with a
//! `conflict_score` coercible to a float in `[0.0, 1.0]` and a string
//! `reasoning`. Anything else is a [`ResponseError`], which callers treat as
//! "not yet analyzed".

use serde_json::{Map, Value};
use thiserror::Error;

use crate::analysis::ConflictScore;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResponseError {
  #[error("no JSON object found in response")]
  NoJsonObject,

  #[error("invalid JSON: {0}")]
  InvalidJson(String),

  #[error("missing field {0:?}")]
  MissingField(&'static str),

  #[error("field {field:?} has unusable value {value}")]
  InvalidField { field: &'static str, value: String },
}

/// A validated scoring result.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredResponse {
  pub conflict_score: ConflictScore,
  pub confidence:     Option<f64>,
  pub reasoning:      String,
}

/// The balanced `{...}` substring opening at byte `start`, honouring string
/// literals and escapes.
fn balanced_from(text: &str, start: usize) -> Option<&str> {
  let mut depth = 0usize;
  let mut in_string = false;
  let mut escaped = false;

  for (offset, c) in text[start..].char_indices() {
    if in_string {
      match c {
        _ if escaped => escaped = false,
        '\\' => escaped = true,
        '"' => in_string = false,
        _ => {}
      }
      continue;
    }
    match c {
      '"' => in_string = true,
      '{' => depth += 1,
      '}' => {
        depth -= 1;
        if depth == 0 {
          return Some(&text[start..start + offset + 1]);
        }
      }
      _ => {}
    }
  }
  None
}

/// Every balanced `{...}` candidate in `text`, by opening position.
fn candidates(text: &str) -> impl Iterator<Item = &str> {
  text.match_indices('{').filter_map(move |(start, _)| balanced_from(text, start))
}

/// Return the first balanced `{...}` substring of `text` that parses as a
/// JSON object. Braces in surrounding prose are skipped.
pub fn find_json_object(text: &str) -> Option<&str> {
  candidates(text).find(|c| matches!(serde_json::from_str::<Value>(c), Ok(Value::Object(_))))
}

fn as_float(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

fn unit_interval(obj: &Map<String, Value>, field: &'static str) -> Result<Option<f64>, ResponseError> {
  match obj.get(field) {
    None | Some(Value::Null) => Ok(None),
    Some(v) => match as_float(v) {
      Some(f) if f.is_finite() && (0.0..=1.0).contains(&f) => Ok(Some(f)),
      _ => Err(ResponseError::InvalidField { field, value: v.to_string() }),
    },
  }
}

/// Parse a raw scoring response.
pub fn parse_scoring_response(text: &str) -> Result<ScoredResponse, ResponseError> {
  let Some(raw) = find_json_object(text) else {
    // Report why the first brace-delimited span was not JSON, if there was one.
    return Err(match candidates(text).next() {
      Some(c) => ResponseError::InvalidJson(
        serde_json::from_str::<Value>(c).err().map(|e| e.to_string()).unwrap_or_default(),
      ),
      None => ResponseError::NoJsonObject,
    });
  };
  let value: Value =
    serde_json::from_str(raw).map_err(|e| ResponseError::InvalidJson(e.to_string()))?;
  let obj = value.as_object().ok_or(ResponseError::NoJsonObject)?;

  let score = unit_interval(obj, "conflict_score")?
    .ok_or(ResponseError::MissingField("conflict_score"))?;
  let conflict_score = ConflictScore::new(score).map_err(|_| ResponseError::InvalidField {
    field: "conflict_score",
    value: score.to_string(),
  })?;

  let reasoning = match obj.get("reasoning") {
    Some(Value::String(s)) => s.trim().to_owned(),
    Some(other) => {
      return Err(ResponseError::InvalidField { field: "reasoning", value: other.to_string() });
    }
    None => return Err(ResponseError::MissingField("reasoning")),
  };

  // A malformed confidence is dropped rather than failing an otherwise good
  // score.
  let confidence = unit_interval(obj, "confidence").ok().flatten();

  Ok(ScoredResponse { conflict_score, confidence, reasoning })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_plain_object() {
    let r = parse_scoring_response(
      r#"{"conflict_score": 0.72, "confidence": 0.8, "reasoning": "Sits on Armed Services."}"#,
    )
    .unwrap();
    assert_eq!(r.conflict_score.value(), 0.72);
    assert_eq!(r.confidence, Some(0.8));
    assert_eq!(r.reasoning, "Sits on Armed Services.");
  }

  #[test]
  fn extracts_object_from_surrounding_prose() {
    let text = "Sure! Here you go:\n```json\n{\"conflict_score\": \"0.1\", \"reasoning\": \"a {brace} in text\"}\n```";
    let r = parse_scoring_response(text).unwrap();
    assert_eq!(r.conflict_score.value(), 0.1);
    assert_eq!(r.reasoning, "a {brace} in text");
    assert_eq!(r.confidence, None);
  }

  #[test]
  fn zero_is_a_valid_score() {
    let r = parse_scoring_response(r#"{"conflict_score": 0, "reasoning": "none"}"#).unwrap();
    assert_eq!(r.conflict_score.value(), 0.0);
  }

  #[test]
  fn rejects_missing_score() {
    assert_eq!(
      parse_scoring_response(r#"{"reasoning": "x"}"#).unwrap_err(),
      ResponseError::MissingField("conflict_score")
    );
  }

  #[test]
  fn rejects_null_score() {
    assert_eq!(
      parse_scoring_response(r#"{"conflict_score": null, "reasoning": "x"}"#).unwrap_err(),
      ResponseError::MissingField("conflict_score")
    );
  }

  #[test]
  fn rejects_missing_reasoning() {
    assert_eq!(
      parse_scoring_response(r#"{"conflict_score": 0.5}"#).unwrap_err(),
      ResponseError::MissingField("reasoning")
    );
  }

  #[test]
  fn rejects_out_of_range_and_non_numeric_scores() {
    assert!(matches!(
      parse_scoring_response(r#"{"conflict_score": 7, "reasoning": "x"}"#),
      Err(ResponseError::InvalidField { field: "conflict_score", .. })
    ));
    assert!(matches!(
      parse_scoring_response(r#"{"conflict_score": "high", "reasoning": "x"}"#),
      Err(ResponseError::InvalidField { field: "conflict_score", .. })
    ));
  }

  #[test]
  fn rejects_text_without_json() {
    assert_eq!(
      parse_scoring_response("I cannot help with that.").unwrap_err(),
      ResponseError::NoJsonObject
    );
    assert_eq!(parse_scoring_response("{ unterminated").unwrap_err(), ResponseError::NoJsonObject);
  }

  #[test]
  fn skips_brace_prose_before_the_object() {
    let text = r#"{note} {"conflict_score": 0.4, "reasoning": "x"}"#;
    assert_eq!(find_json_object(text), Some(r#"{"conflict_score": 0.4, "reasoning": "x"}"#));
    let r = parse_scoring_response(text).unwrap();
    assert_eq!(r.conflict_score.value(), 0.4);
    assert_eq!(r.reasoning, "x");
  }

  #[test]
  fn braces_that_never_hold_json_are_invalid() {
    assert!(matches!(
      parse_scoring_response("{note} and {another}"),
      Err(ResponseError::InvalidJson(_))
    ));
  }

  #[test]
  fn bad_confidence_is_dropped() {
    let r = parse_scoring_response(r#"{"conflict_score": 0.4, "confidence": 9, "reasoning": "x"}"#)
      .unwrap();
    assert_eq!(r.confidence, None);
  }
}
