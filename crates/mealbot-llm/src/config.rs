//! Provider endpoint configuration.

use std::time::Duration;

use mealbot_types::config::LlmConfig;

/// Where and how to reach a chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Name used in log fields (e.g. "openai").
    pub name: String,

    /// Base URL without the `/chat/completions` suffix.
    pub base_url: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Endpoint from the `[llm]` section. A zero timeout becomes one second.
    pub fn from_llm_config(cfg: &LlmConfig) -> Self {
        Self {
            name: "openai".into(),
            base_url: cfg.base_url.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_llm_config_copies_endpoint() {
        let cfg = LlmConfig {
            base_url: "http://localhost:11434/v1".into(),
            timeout_secs: 0,
            ..Default::default()
        };
        let pc = ProviderConfig::from_llm_config(&cfg);
        assert_eq!(pc.base_url, "http://localhost:11434/v1");
        assert_eq!(pc.timeout, Duration::from_secs(1));
    }
}
