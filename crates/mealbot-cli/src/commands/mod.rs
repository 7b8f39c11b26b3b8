//! CLI command implementations for `mealbot`.
//!
//! - [`serve`] -- Wire every component and run the HTTP server.
//! - [`check`] -- Configuration diagnostics.

pub mod check;
pub mod serve;

use std::path::Path;

use mealbot_types::config::Config;
use mealbot_types::config::loader;

/// Load configuration from the given path override or via auto-discovery.
///
/// Discovery order: `--config`, then `MEALBOT_CONFIG`, then
/// `~/.mealbot/config.json`. Defaults are used when nothing is found.
pub fn load_config(config_override: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = config_override
        && !path.exists()
    {
        anyhow::bail!("config file not found: {}", path.display());
    }
    Ok(loader::load_config(config_override)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "gateway": { "port": 9100 } }"#).unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.gateway.port, 9100);
    }
}
