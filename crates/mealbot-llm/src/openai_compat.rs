//! OpenAI-compatible provider.

use async_trait::async_trait;
use mealbot_types::SecretString;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::types::{ChatRequest, ChatResponse};

/// Talks to any endpoint that accepts the OpenAI chat-completions format.
pub struct OpenAiCompatProvider {
    config: ProviderConfig,
    http: reqwest::Client,
    api_key: SecretString,
}

impl OpenAiCompatProvider {
    /// Provider posting to `{base_url}/chat/completions` with `api_key` as
    /// the bearer token.
    pub fn new(config: ProviderConfig, api_key: SecretString) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            http,
            api_key,
        })
    }

    /// Endpoint this provider talks to.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured("no API key".into()));
        }

        debug!(
            provider = %self.config.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending chat completion request"
        );

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(self.api_key.expose())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Http(e)
                }
            })?;
        let status = response.status();

        if !status.is_success() {
            let header_ms = parse_retry_after_header(&response);
            let body = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                429 => {
                    let retry_after_ms = header_ms
                        .or_else(|| parse_retry_after_ms(&body))
                        .unwrap_or(1000);
                    warn!(provider = %self.config.name, retry_after_ms, "rate limited");
                    ProviderError::RateLimited { retry_after_ms }
                }
                401 | 403 => ProviderError::AuthFailed(
                    extract_error_message(&body).unwrap_or(body),
                ),
                _ => ProviderError::RequestFailed(format!(
                    "HTTP {status}: {}",
                    extract_error_message(&body).unwrap_or(body)
                )),
            });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("failed to parse response: {e}"))
        })?;

        if chat_response.choices.is_empty() {
            return Err(ProviderError::InvalidResponse("no choices".into()));
        }

        debug!(
            provider = %self.config.name,
            model = %chat_response.model,
            finish_reason = ?chat_response.choices[0].finish_reason,
            total_tokens = chat_response.usage.as_ref().map(|u| u.total_tokens),
            "chat completion response received"
        );

        Ok(chat_response)
    }
}

/// `{"error": {"message": "..."}}` or `{"error": "..."}`.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .map(String::from)
}

/// Numeric `Retry-After` seconds, converted to milliseconds.
fn parse_retry_after_header(response: &reqwest::Response) -> Option<u64> {
    let secs: f64 = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    Some((secs * 1000.0).max(0.0) as u64)
}

fn parse_retry_after_ms(body: &str) -> Option<u64> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("retry_after_ms")
        .and_then(|v| v.as_u64())
        .or_else(|| {
            value
                .get("retry_after")
                .and_then(|v| v.as_f64())
                .map(|secs| (secs * 1000.0) as u64)
        })
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("name", &self.config.name)
            .field("base_url", &self.config.base_url)
            .field("api_key", &self.api_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn provider(base_url: &str) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new(
            ProviderConfig {
                name: "openai".into(),
                base_url: base_url.into(),
                timeout: Duration::from_secs(5),
            },
            SecretString::new("sk-abc123def456"),
        )
        .unwrap()
    }

    #[test]
    fn completions_url_trims_trailing_slash() {
        assert_eq!(
            provider("https://api.openai.com/v1/").completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn extract_error_message_formats() {
        assert_eq!(
            extract_error_message(r#"{"error": {"message": "bad key"}}"#).as_deref(),
            Some("bad key")
        );
        assert_eq!(
            extract_error_message(r#"{"error": "quota"}"#).as_deref(),
            Some("quota")
        );
        assert_eq!(extract_error_message("plain text"), None);
    }

    #[test]
    fn parse_retry_after_ms_fields() {
        assert_eq!(parse_retry_after_ms(r#"{"retry_after_ms": 2500}"#), Some(2500));
        assert_eq!(parse_retry_after_ms(r#"{"retry_after": 3.5}"#), Some(3500));
        assert_eq!(parse_retry_after_ms("not json"), None);
    }

    #[test]
    fn debug_never_leaks_api_key() {
        let dbg = format!("{:?}", provider("http://localhost"));
        assert!(!dbg.contains("sk-abc123def456"));
        assert!(dbg.contains("REDACTED"));
    }
}
