//! The scoring capability: an opaque "ask the model" call.

use std::future::Future;

/// One request to the scoring capability.
#[derive(Debug, Clone)]
pub struct ScoringRequest {
  /// System instruction constraining the output format.
  pub system:      String,
  pub prompt:      String,
  /// Sampling temperature; low values for deterministic scoring.
  pub temperature: f32,
  /// Ask the backend to constrain output to a JSON object where supported.
  pub json_only:   bool,
}

/// Abstraction over a language-model backend.
///
/// Implementations return the raw response text. Parsing and validation are
/// the caller's job, see [`crate::response::parse_scoring_response`].
pub trait ScoringCapability: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Identifier of the model answering requests; recorded on every analysis.
  fn model(&self) -> &str;

  fn score(
    &self,
    request: ScoringRequest,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;
}
