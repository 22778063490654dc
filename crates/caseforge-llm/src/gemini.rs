//! Gemini provider implementing the [`Provider`] trait.
//!
//! Non-streaming `models/{model}:generateContent` POST against the
//! Generative Language API, authenticated by API key header. The base URL
//! is overridable for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use caseforge_core::classify::classify;

use crate::provider::{GenerationRequest, Provider, ProviderError, ProviderResult};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────────────────────────────────────

/// Gemini HTTP client.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    /// Create a provider against the production endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a provider against a custom base URL (tests).
    #[must_use]
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    fn body_for(request: &GenerationRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: request.payload.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.options.temperature,
                max_output_tokens: request.options.max_output_tokens,
                response_mime_type: request.options.json_output.then_some("application/json"),
            },
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip_all, fields(model = %request.target))]
    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.target);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::body_for(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text);

        match text {
            Some(text) if !text.is_empty() => {
                debug!(chars = text.len(), "generation complete");
                Ok(text)
            }
            _ => Err(ProviderError::EmptyResponse),
        }
    }
}

/// Build an [`ProviderError::Api`] from a non-2xx response body.
///
/// Prefers the structured `{"error": {"code", "message"}}` envelope,
/// falling back to the raw body text. The classified text includes the
/// status code so bare bodies still categorize correctly.
fn api_error(status: u16, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .map_or_else(
            || body.trim().to_owned(),
            |detail| {
                if detail.message.is_empty() {
                    format!("error code {}", detail.code)
                } else {
                    detail.message
                }
            },
        );

    let category = classify(&format!("{status} {message}"));
    ProviderError::Api {
        status,
        message,
        category,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use caseforge_core::classify::ErrorCategory;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn success_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [
                {"content": {"parts": [{"text": text}], "role": "model"}}
            ]
        })
    }

    async fn provider_for(server: &MockServer) -> GeminiProvider {
        GeminiProvider::with_base_url("test-key", server.uri())
    }

    #[tokio::test]
    async fn generate_returns_first_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("{\"ok\": true}")))
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let text = provider
            .generate(&GenerationRequest::new("gemini-2.0-flash", "hello"))
            .await
            .unwrap();
        assert_eq!(text, "{\"ok\": true}");
    }

    #[tokio::test]
    async fn request_carries_prompt_and_json_mime_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{"parts": [{"text": "the prompt"}]}],
                "generationConfig": {"temperature": 0.3, "responseMimeType": "application/json"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("{}")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let _ = provider
            .generate(&GenerationRequest::new("gemini-2.0-flash", "the prompt"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn quota_error_body_is_classified_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {
                    "code": 429,
                    "message": "Resource has been exhausted (e.g. check quota). Please retry in 13.8s.",
                    "status": "RESOURCE_EXHAUSTED"
                }
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let err = provider
            .generate(&GenerationRequest::new("gemini-2.0-flash", "p"))
            .await
            .unwrap_err();
        assert_matches!(err, ProviderError::Api { status: 429, .. });
        assert!(err.is_transient());
        assert!(err.message().contains("retry in 13.8s"));
    }

    #[tokio::test]
    async fn auth_error_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "API key not valid. Please pass a valid API key."}
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let err = provider
            .generate(&GenerationRequest::new("gemini-2.0-flash", "p"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidCredentials);
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn unstructured_error_body_falls_back_to_raw_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream connect error"))
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let err = provider
            .generate(&GenerationRequest::new("gemini-2.0-flash", "p"))
            .await
            .unwrap_err();
        assert_matches!(err, ProviderError::Api { status: 503, .. });
        assert_eq!(err.category(), ErrorCategory::ServiceUnavailable);
    }

    #[tokio::test]
    async fn missing_candidates_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let err = provider
            .generate(&GenerationRequest::new("gemini-2.0-flash", "p"))
            .await
            .unwrap_err();
        assert_matches!(err, ProviderError::EmptyResponse);
    }
}
