//! `mealbot check` -- load configuration, validate it and print a summary.
//!
//! Secrets are reported as set or missing, never printed.

use std::path::PathBuf;

use clap::Args;
use mealbot_types::SecretString;
use mealbot_types::config::{Config, StoreBackend};

use super::load_config;

/// Arguments for the `mealbot check` subcommand.
#[derive(Args)]
pub struct CheckArgs {
    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Print the effective configuration with secrets masked, then validate it.
pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    print!("{}", summary(&config));

    config.validate()?;
    println!();
    println!("Configuration OK");
    Ok(())
}

fn flag(secret: &SecretString) -> &'static str {
    if secret.is_empty() { "missing" } else { "set" }
}

fn summary(config: &Config) -> String {
    let store = match config.store.backend {
        StoreBackend::Memory => "memory".to_owned(),
        StoreBackend::Rest => format!(
            "rest ({})",
            config.store.base_url.as_deref().unwrap_or("no base_url")
        ),
    };

    let mut out = String::new();
    out.push_str("mealbot check\n=============\n\n");
    out.push_str("Gateway:\n");
    out.push_str(&format!(
        "  Listen:         {}:{}\n",
        config.gateway.host, config.gateway.port
    ));
    out.push_str(&format!(
        "  Webhook:        {}\n",
        config.gateway.route_url("/callback")
    ));
    out.push_str(&format!(
        "  Login callback: {}\n",
        config.gateway.callback_url()
    ));
    out.push_str(&format!("  Frontend:       {}\n", config.gateway.frontend_url));
    out.push_str("\nLINE:\n");
    out.push_str(&format!(
        "  Channel secret:       {}\n",
        flag(&config.line.channel_secret)
    ));
    out.push_str(&format!(
        "  Channel access token: {}\n",
        flag(&config.line.channel_access_token)
    ));
    out.push_str(&format!(
        "  Login channel id:     {}\n",
        if config.line.login_channel_id.is_empty() {
            "missing"
        } else {
            config.line.login_channel_id.as_str()
        }
    ));
    out.push_str(&format!(
        "  Login channel secret: {}\n",
        flag(&config.line.login_channel_secret)
    ));
    out.push_str("\nAgent:\n");
    out.push_str(&format!("  Model:          {}\n", config.agent.model));
    out.push_str(&format!("  Provider:       {}\n", config.llm.base_url));
    out.push_str(&format!("  API key:        {}\n", flag(&config.llm.api_key)));
    out.push_str(&format!(
        "  Max iterations: {}\n",
        config.agent.max_iterations
    ));
    out.push_str(&format!(
        "  Memory window:  {}\n",
        config.agent.memory_window
    ));
    out.push_str("\nStore:\n");
    out.push_str(&format!("  Backend:     {store}\n"));
    out.push_str(&format!(
        "  Recommender: {}\n",
        config.recommender.base_url
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_hides_secret_values() {
        let mut config = Config::default();
        config.line.channel_secret = "super-secret-value".into();
        config.llm.api_key = "sk-live-123".into();

        let text = summary(&config);
        assert!(!text.contains("super-secret-value"));
        assert!(!text.contains("sk-live-123"));
        assert!(text.contains("Channel secret:       set"));
        assert!(text.contains("Channel access token: missing"));
    }

    #[test]
    fn summary_shows_routes_under_prefix() {
        let config = Config::default();
        let text = summary(&config);
        assert!(text.contains("http://localhost:8000/api/ai/callback"));
        assert!(text.contains("http://localhost:8000/api/ai/auth/callback"));
    }

    #[test]
    fn check_fails_on_incomplete_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "agent": { "max_iterations": 0 } }"#).unwrap();
        let err = run(CheckArgs { config: Some(path) }).unwrap_err();
        assert!(err.to_string().contains("agent.max_iterations"));
    }
}
