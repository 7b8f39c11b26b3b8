//! Configuration file discovery and loading.
//!
//! Discovery order:
//! 1. An explicit path (the `--config` flag).
//! 2. The `MEALBOT_CONFIG` environment variable.
//! 3. `~/.mealbot/config.json`, if it exists.
//! 4. Built-in defaults.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::Config;
use crate::error::MealbotError;

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "MEALBOT_CONFIG";

/// Find the config file to load, if any.
///
/// Explicit and environment-provided paths are returned without an
/// existence check so a typo surfaces as a read error instead of silently
/// falling back to defaults.
pub fn discover_config_path<F>(
    explicit: Option<&Path>,
    env: F,
    home_dir: Option<PathBuf>,
) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let candidate = home_dir?.join(".mealbot").join("config.json");
    candidate.exists().then_some(candidate)
}

/// Read and parse a config file. Secrets are not resolved.
pub fn load_config_file(path: &Path) -> Result<Config, MealbotError> {
    debug!(path = %path.display(), "loading config file");
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| MealbotError::ConfigInvalid {
        reason: format!("failed to parse {}: {e}", path.display()),
    })
}

/// Discover, load and resolve secrets against the process environment.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, MealbotError> {
    let path = discover_config_path(explicit, |name| std::env::var(name).ok(), dirs::home_dir());
    let config = match path {
        Some(path) => load_config_file(&path)?,
        None => {
            info!("no config file found, using defaults");
            Config::default()
        }
    };
    Ok(config.resolve_secrets())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let p = discover_config_path(
            Some(Path::new("/etc/mealbot.json")),
            |_| Some("/from/env.json".into()),
            None,
        );
        assert_eq!(p, Some(PathBuf::from("/etc/mealbot.json")));
    }

    #[test]
    fn env_var_beats_home() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(home.path().join(".mealbot")).unwrap();
        std::fs::write(home.path().join(".mealbot/config.json"), "{}").unwrap();

        let p = discover_config_path(
            None,
            |name| (name == CONFIG_ENV_VAR).then(|| "/from/env.json".to_owned()),
            Some(home.path().to_path_buf()),
        );
        assert_eq!(p, Some(PathBuf::from("/from/env.json")));
    }

    #[test]
    fn home_config_used_when_present() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(home.path().join(".mealbot")).unwrap();
        let file = home.path().join(".mealbot/config.json");
        std::fs::write(&file, "{}").unwrap();

        let p = discover_config_path(None, |_| None, Some(home.path().to_path_buf()));
        assert_eq!(p, Some(file));
    }

    #[test]
    fn nothing_found_means_defaults() {
        let home = tempfile::tempdir().unwrap();
        let p = discover_config_path(None, |_| None, Some(home.path().to_path_buf()));
        assert!(p.is_none());
    }

    #[test]
    fn load_file_parses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.json");
        std::fs::write(
            &file,
            r#"{"gateway": {"port": 9100, "routePrefix": "/bot"}, "agent": {"maxIterations": 4}}"#,
        )
        .unwrap();

        let cfg = load_config_file(&file).unwrap();
        assert_eq!(cfg.gateway.port, 9100);
        assert_eq!(cfg.gateway.route_prefix, "/bot");
        assert_eq!(cfg.agent.max_iterations, 4);
        assert_eq!(cfg.agent.memory_window, 10);
    }

    #[test]
    fn load_file_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.json");
        std::fs::write(&file, "{ not json").unwrap();
        let err = load_config_file(&file).unwrap_err();
        assert!(matches!(err, MealbotError::ConfigInvalid { .. }));
    }

    #[test]
    fn load_missing_explicit_file_is_io_error() {
        let err = load_config_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, MealbotError::Io(_)));
    }
}
