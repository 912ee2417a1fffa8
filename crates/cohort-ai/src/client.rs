//! Client for the text-generation REST API.
//!
//! The service is a black box: one prompt and an optional system
//! instruction go in, one completion string comes out.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::AiConfig;
use crate::error::{GenerationError, Result};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// A text-completion service.
pub trait GenerationService {
    /// Returns the completion for `prompt` under the system `instruction`.
    ///
    /// An empty instruction means none.
    fn generate(&self, prompt: &str, instruction: &str) -> Result<String>;
}

impl<T: GenerationService + ?Sized> GenerationService for &T {
    fn generate(&self, prompt: &str, instruction: &str) -> Result<String> {
        (**self).generate(prompt, instruction)
    }
}

impl<T: GenerationService + ?Sized> GenerationService for Box<T> {
    fn generate(&self, prompt: &str, instruction: &str) -> Result<String> {
        (**self).generate(prompt, instruction)
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(text: &str) -> Self {
        Self {
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

/// Builds the JSON request body for one completion.
pub fn build_request_body(prompt: &str, instruction: &str) -> serde_json::Value {
    let request = GenerateRequest {
        contents: vec![Content::text(prompt)],
        system_instruction: (!instruction.is_empty()).then(|| Content::text(instruction)),
    };
    serde_json::json!(request)
}

/// Extracts the completion text from a response body.
///
/// The text lives at `candidates[0].content.parts[0].text`; anything else is
/// a malformed envelope.
pub fn parse_envelope(body: &str) -> Result<String> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::MalformedEnvelope(e.to_string()))?;
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| GenerationError::MalformedEnvelope("no completion text".to_string()))
}

/// Blocking HTTP client for the Gemini `generateContent` API.
pub struct GeminiClient {
    client: Client,
    url: String,
    api_key: String,
}

impl GeminiClient {
    /// Creates a client, failing early when no API key is configured.
    pub fn new(config: &AiConfig) -> Result<Self> {
        let api_key = config.api_key()?.to_string();
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(GenerationError::from)?;

        Ok(Self {
            client,
            url: config.request_url(),
            api_key,
        })
    }
}

impl GenerationService for GeminiClient {
    fn generate(&self, prompt: &str, instruction: &str) -> Result<String> {
        debug!(url = %self.url, "sending generation request");
        trace!(
            prompt_len = prompt.len(),
            instruction_len = instruction.len(),
            "generation request size"
        );

        let response = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&build_request_body(prompt, instruction))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text()?;
        let text = parse_envelope(&body)?;
        trace!(completion_len = text.len(), "generation response size");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_with_instruction() {
        let body = build_request_body("Which variables?", "You are a research assistant.");
        insta::assert_json_snapshot!(body, @r#"
        {
          "contents": [
            {
              "parts": [
                {
                  "text": "Which variables?"
                }
              ]
            }
          ],
          "systemInstruction": {
            "parts": [
              {
                "text": "You are a research assistant."
              }
            ]
          }
        }
        "#);
    }

    #[test]
    fn test_request_body_without_instruction() {
        let body = build_request_body("hello", "");
        assert!(body.get("systemInstruction").is_none());
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn test_parse_envelope() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"answer"}],"role":"model"}}]}"#;
        assert_eq!(parse_envelope(body).unwrap(), "answer");
    }

    #[test]
    fn test_parse_envelope_malformed() {
        for body in [
            "not json",
            "{}",
            r#"{"candidates":[]}"#,
            r#"{"candidates":[{"finishReason":"SAFETY"}]}"#,
            r#"{"candidates":[{"content":{"parts":[{}]}}]}"#,
        ] {
            assert!(
                matches!(parse_envelope(body), Err(GenerationError::MalformedEnvelope(_))),
                "{body}"
            );
        }
    }

    #[test]
    fn test_client_requires_api_key() {
        assert!(matches!(
            GeminiClient::new(&AiConfig::default()),
            Err(GenerationError::MissingApiKey)
        ));
    }
}
