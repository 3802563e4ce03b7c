//! Scoring over an OpenAI-compatible `/chat/completions` endpoint.

use anyhow::Context as _;
use capitol_core::scoring::{ScoringCapability, ScoringRequest};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ScoringConfig;

#[derive(Debug, Error)]
pub enum ScorerError {
  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("scoring endpoint returned {status}: {body}")]
  Status { status: StatusCode, body: String },

  #[error("response carried no message content")]
  EmptyResponse,
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
  model:           &'a str,
  messages:        [ChatMessage<'a>; 2],
  temperature:     f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
  role:    &'static str,
  content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
  #[serde(rename = "type")]
  kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
  message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
  #[serde(default)]
  content: Option<String>,
}

impl ChatResponse {
  fn into_content(self) -> Result<String, ScorerError> {
    self
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .filter(|c| !c.trim().is_empty())
      .ok_or(ScorerError::EmptyResponse)
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpScorer {
  client:  Client,
  url:     String,
  model:   String,
  api_key: Option<String>,
}

impl HttpScorer {
  pub fn new(config: &ScoringConfig) -> anyhow::Result<Self> {
    // The analyzer enforces its own per-call timeout; this one only bounds a
    // stuck connection.
    let client = Client::builder()
      .timeout(config.timeout() * 2)
      .build()
      .context("failed to build HTTP client")?;

    Ok(Self {
      client,
      url: format!("{}/chat/completions", config.endpoint.trim_end_matches('/')),
      model: config.model.clone(),
      api_key: config.api_key.clone().filter(|k| !k.is_empty()),
    })
  }

  fn body<'a>(&'a self, request: &'a ScoringRequest) -> ChatRequest<'a> {
    ChatRequest {
      model:           &self.model,
      messages:        [
        ChatMessage { role: "system", content: &request.system },
        ChatMessage { role: "user", content: &request.prompt },
      ],
      temperature:     request.temperature,
      response_format: request.json_only.then_some(ResponseFormat { kind: "json_object" }),
    }
  }

  async fn complete(&self, request: ScoringRequest) -> Result<String, ScorerError> {
    let mut req = self.client.post(&self.url).json(&self.body(&request));
    if let Some(key) = &self.api_key {
      req = req.bearer_auth(key);
    }

    debug!(model = %self.model, url = %self.url, "sending scoring request");
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(ScorerError::Status { status, body });
    }

    let parsed: ChatResponse = resp.json().await?;
    parsed.into_content()
  }
}

impl ScoringCapability for HttpScorer {
  type Error = ScorerError;

  fn model(&self) -> &str { &self.model }

  async fn score(&self, request: ScoringRequest) -> Result<String, ScorerError> {
    self.complete(request).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scorer() -> HttpScorer {
    HttpScorer::new(&ScoringConfig {
      endpoint: "http://localhost:11434/v1/".into(),
      api_key: Some(String::new()),
      ..ScoringConfig::default()
    })
    .unwrap()
  }

  #[test]
  fn url_and_empty_key_are_normalised() {
    let s = scorer();
    assert_eq!(s.url, "http://localhost:11434/v1/chat/completions");
    assert!(s.api_key.is_none());
  }

  #[test]
  fn request_body_carries_both_messages_and_json_mode() {
    let s = scorer();
    let request = ScoringRequest {
      system:      "be terse".into(),
      prompt:      "## Trades".into(),
      temperature: 0.1,
      json_only:   true,
    };
    let body = serde_json::to_value(s.body(&request)).unwrap();
    assert_eq!(body["model"], "llama3.1");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "be terse");
    assert_eq!(body["messages"][1]["content"], "## Trades");
    assert_eq!(body["response_format"]["type"], "json_object");

    let free = ScoringRequest { json_only: false, ..request };
    let body = serde_json::to_value(s.body(&free)).unwrap();
    assert!(body.get("response_format").is_none());
  }

  #[test]
  fn first_choice_content_is_returned() {
    let resp: ChatResponse = serde_json::from_str(
      r#"{"choices":[{"message":{"role":"assistant","content":"{\"conflict_score\":0.2}"}}]}"#,
    )
    .unwrap();
    assert_eq!(resp.into_content().unwrap(), r#"{"conflict_score":0.2}"#);
  }

  #[test]
  fn missing_or_blank_content_is_an_error() {
    let none: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
    assert!(matches!(none.into_content(), Err(ScorerError::EmptyResponse)));

    let blank: ChatResponse =
      serde_json::from_str(r#"{"choices":[{"message":{"content":"  "}}]}"#).unwrap();
    assert!(matches!(blank.into_content(), Err(ScorerError::EmptyResponse)));
  }
}
