//! Configuration management for Helmsman
//!
//! Configuration is loaded from `~/.helmsman/config.json` with environment
//! variable overrides of the form `HELMSMAN_SECTION_KEY`.

mod types;
pub mod validate;

pub use types::*;

use std::path::{Path, PathBuf};

use crate::error::{HelmError, Result};

const REDACTED: &str = "***";

impl Config {
    /// Returns the Helmsman configuration directory path (~/.helmsman)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".helmsman")
    }

    /// Returns the path to the config file (~/.helmsman/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    ///
    /// A missing file yields the default configuration.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content).map_err(|e| {
                HelmError::Config(format!("Invalid config file {}: {}", path.display(), e))
            })?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration as pretty JSON, creating the parent directory.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `HELMSMAN_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse_into<T: std::str::FromStr>(value: Option<String>, target: &mut T) {
            if let Some(v) = value.and_then(|v| v.trim().parse().ok()) {
                *target = v;
            }
        }

        // Agent
        if let Some(val) = lookup("HELMSMAN_AGENT_MODEL") {
            self.agent.model = val;
        }
        if let Some(val) = lookup("HELMSMAN_AGENT_TITLE_MODEL") {
            self.agent.title_model = val;
        }
        parse_into(lookup("HELMSMAN_AGENT_MAX_TOKENS"), &mut self.agent.max_tokens);
        parse_into(lookup("HELMSMAN_AGENT_TEMPERATURE"), &mut self.agent.temperature);
        parse_into(lookup("HELMSMAN_AGENT_MAX_ITER"), &mut self.agent.max_iter);
        parse_into(lookup("HELMSMAN_AGENT_MAX_TURNS"), &mut self.agent.max_turns);

        // Providers
        if let Some(val) = lookup("HELMSMAN_PROVIDERS_GROQ_API_KEY") {
            self.providers.groq.api_key = Some(val);
        }
        if let Some(val) = lookup("HELMSMAN_PROVIDERS_GROQ_API_BASE") {
            self.providers.groq.api_base = Some(val);
        }
        parse_into(
            lookup("HELMSMAN_PROVIDERS_RETRY_MAX_RETRIES"),
            &mut self.providers.retry.max_retries,
        );
        parse_into(
            lookup("HELMSMAN_PROVIDERS_RETRY_BASE_DELAY_MS"),
            &mut self.providers.retry.base_delay_ms,
        );

        // Store
        if let Some(val) = lookup("HELMSMAN_STORE_BASE_URL") {
            self.store.base_url = Some(val);
        }
        if let Some(val) = lookup("HELMSMAN_STORE_INTERNAL_KEY") {
            self.store.internal_key = Some(val);
        }

        // Job
        parse_into(lookup("HELMSMAN_JOB_SYNC_DELAY_MS"), &mut self.job.sync_delay_ms);
        parse_into(lookup("HELMSMAN_JOB_HISTORY_LIMIT"), &mut self.job.history_limit);

        // Logging
        if let Some(val) = lookup("HELMSMAN_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("HELMSMAN_LOG_FORMAT") {
            if let Ok(format) = serde_json::from_value(serde_json::Value::String(val)) {
                self.logging.format = format;
            }
        }
    }

    /// Check the semantic constraints serde cannot express.
    ///
    /// Returns human-readable problems; an empty list means the config is
    /// usable for `serve`.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.store.internal_key().is_none() {
            problems.push("store.internal_key is not configured".to_string());
        }
        if self.store.base_url.as_deref().map_or(true, |u| u.trim().is_empty()) {
            problems.push("store.base_url is not configured".to_string());
        }
        if self
            .providers
            .groq
            .api_key
            .as_deref()
            .map_or(true, |k| k.trim().is_empty())
        {
            problems.push("providers.groq.api_key is not configured".to_string());
        }
        if self.agent.model.trim().is_empty() {
            problems.push("agent.model must not be empty".to_string());
        }
        if self.agent.max_iter == 0 {
            problems.push("agent.max_iter must be at least 1".to_string());
        }
        if self.agent.max_turns < 2 {
            problems.push("agent.max_turns must be at least 2".to_string());
        }
        if !(0.0..=2.0).contains(&self.agent.temperature) {
            problems.push("agent.temperature must be between 0.0 and 2.0".to_string());
        }
        if self.job.history_limit == 0 {
            problems.push("job.history_limit must be at least 1".to_string());
        }
        if self.dispatcher.buffer_size == 0 {
            problems.push("dispatcher.buffer_size must be at least 1".to_string());
        }

        problems
    }

    /// Copy of the configuration with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.providers.groq.api_key.is_some() {
            copy.providers.groq.api_key = Some(REDACTED.to_string());
        }
        if copy.store.internal_key.is_some() {
            copy.store.internal_key = Some(REDACTED.to_string());
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.agent.model, "llama-3.1-8b-instant");
        assert_eq!(config.agent.max_iter, 10);
        assert_eq!(config.agent.max_turns, 20);
        assert_eq!(config.agent.max_tokens, 4096);
        assert_eq!(config.job.sync_delay_ms, 1000);
        assert_eq!(config.job.history_limit, 10);
        assert_eq!(config.providers.retry.max_retries, 3);
        assert_eq!(config.providers.retry.base_delay_ms, 1000);
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{"agent": {"max_turns": 30}, "store": {"internal_key": "k"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.agent.max_turns, 30);
        assert_eq!(config.agent.max_iter, 10);
        assert_eq!(config.store.internal_key(), Some("k"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(lookup_from(&[
            ("HELMSMAN_STORE_INTERNAL_KEY", "secret"),
            ("HELMSMAN_PROVIDERS_GROQ_API_KEY", "gsk-1"),
            ("HELMSMAN_AGENT_MODEL", "llama-3.3-70b-versatile"),
            ("HELMSMAN_JOB_SYNC_DELAY_MS", "250"),
            ("HELMSMAN_AGENT_MAX_ITER", "not-a-number"),
            ("HELMSMAN_LOG_FORMAT", "json"),
        ]));

        assert_eq!(config.store.internal_key(), Some("secret"));
        assert_eq!(config.providers.groq.api_key.as_deref(), Some("gsk-1"));
        assert_eq!(config.agent.model, "llama-3.3-70b-versatile");
        assert_eq!(config.job.sync_delay_ms, 250);
        assert_eq!(config.agent.max_iter, 10);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_blank_internal_key_is_missing() {
        let mut config = Config::default();
        config.store.internal_key = Some("   ".to_string());
        assert!(config.store.internal_key().is_none());
    }

    #[test]
    fn test_validate_reports_missing_credentials() {
        let problems = Config::default().validate();
        assert!(problems.iter().any(|p| p.contains("store.internal_key")));
        assert!(problems.iter().any(|p| p.contains("providers.groq.api_key")));
    }

    #[test]
    fn test_validate_bounds() {
        let mut config = Config::default();
        config.store.internal_key = Some("k".into());
        config.store.base_url = Some("https://db.example.com".into());
        config.providers.groq.api_key = Some("gsk".into());
        assert!(config.validate().is_empty());

        config.agent.max_iter = 0;
        config.agent.max_turns = 1;
        let problems = config.validate();
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let mut config = Config::default();
        config.store.internal_key = Some("secret".into());
        config.providers.groq.api_key = Some("gsk-secret".into());
        let json = serde_json::to_string(&config.redacted()).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains(REDACTED));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.agent.max_turns = 12;
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.agent.max_turns, 12);
    }

    #[test]
    fn test_load_nonexistent() {
        let dir = tempdir().unwrap();
        let config = Config::load_from_path(&dir.path().join("missing.json")).unwrap();
        assert_eq!(config.agent.max_iter, 10);
    }

    #[test]
    fn test_load_invalid_json_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(err, HelmError::Config(_)));
    }
}
