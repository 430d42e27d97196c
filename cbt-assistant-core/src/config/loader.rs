//! Configuration loading and management

use super::schema::Config;
use super::validate::validate_config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";
const ENV_PREFIX: &str = "CBT_ASSISTANT__";

/// Settings-style environment names and the config path each one feeds.
/// `true` marks values parsed as JSON/number/bool rather than taken verbatim.
const ENV_ALIASES: &[(&str, &str, bool)] = &[
    ("APP_NAME", "app.name", false),
    ("HOST", "server.host", false),
    ("PORT", "server.port", true),
    ("ALLOWED_ORIGINS", "server.allowed_origins", true),
    ("OLLAMA_HOST", "provider.api_base", false),
    ("AI_MODEL", "provider.model", false),
    ("LOG_LEVEL", "logging.level", false),
];

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".cbt-assistant"))
            .unwrap_or_else(|| PathBuf::from(".cbt-assistant"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and environment.
    ///
    /// Precedence, lowest first: built-in defaults, `config.json`, alias
    /// variables (`AI_MODEL`, `PORT`, ...), `CBT_ASSISTANT__*` path variables.
    pub fn load(&self) -> crate::Result<Config> {
        let mut merged = serde_json::to_value(Config::default())?;

        let config_path = self.config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let file_value: Value = serde_json::from_str(&content)?;
            merge_values(&mut merged, file_value);
        }

        apply_alias_overrides(&mut merged);
        apply_path_overrides(&mut merged);

        let config: Config = serde_json::from_value(merged)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(self.config_path(), content)?;
        Ok(())
    }

    /// Full path of the config file
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if let Some(existing) = base_map.get_mut(&key) {
                    merge_values(existing, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

fn parse_env_value(raw: &str) -> Value {
    if let Ok(v) = serde_json::from_str::<Value>(raw) {
        return v;
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::String(raw.to_string())
}

fn set_path_value(root: &mut Value, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return;
    };

    let mut current = root;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert(last.clone(), value);
    }
}

fn apply_alias_overrides(config: &mut Value) {
    for (env_key, target_path, parsed) in ENV_ALIASES {
        let Ok(raw) = std::env::var(env_key) else {
            continue;
        };
        let value = if *parsed {
            parse_env_value(&raw)
        } else {
            Value::String(raw)
        };
        let path: Vec<String> = target_path.split('.').map(ToString::to_string).collect();
        set_path_value(config, &path, value);
    }
}

fn apply_path_overrides(config: &mut Value) {
    for (key, value) in std::env::vars() {
        let Some(suffix) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let segments: Vec<String> = suffix
            .split("__")
            .filter(|s| !s.is_empty())
            .map(|s| s.to_ascii_lowercase())
            .collect();
        if segments.is_empty() {
            continue;
        }
        set_path_value(config, &segments, parse_env_value(&value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::{Mutex, MutexGuard};
    use tempfile::TempDir;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    struct EnvVarGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            // SAFETY: tests serialize env mutations with ENV_LOCK.
            unsafe { std::env::set_var(key, value) };
            Self {
                key: key.to_string(),
                original,
            }
        }

        fn unset(key: &str) -> Self {
            let original = std::env::var(key).ok();
            // SAFETY: tests serialize env mutations with ENV_LOCK.
            unsafe { std::env::remove_var(key) };
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.original {
                // SAFETY: tests serialize env mutations with ENV_LOCK.
                unsafe { std::env::set_var(&self.key, value) };
            } else {
                // SAFETY: tests serialize env mutations with ENV_LOCK.
                unsafe { std::env::remove_var(&self.key) };
            }
        }
    }

    fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn test_load_default_config() {
        let _lock = lock_env();
        let _model = EnvVarGuard::unset("AI_MODEL");
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        let config = loader.load().unwrap();

        assert_eq!(config.provider.model, "mistral:latest");
        assert_eq!(config.provider.timeout_secs, 120);
        assert!(!config.agent.rollback_on_failure);
    }

    #[test]
    fn test_save_and_load_config() {
        let _lock = lock_env();
        let _model = EnvVarGuard::unset("AI_MODEL");
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());

        let mut config = Config::default();
        config.provider.model = "llama3.2:latest".to_string();
        config.agent.rollback_on_failure = true;

        loader.save(&config).unwrap();
        let loaded = loader.load().unwrap();

        assert_eq!(loaded.provider.model, "llama3.2:latest");
        assert!(loaded.agent.rollback_on_failure);
    }

    #[test]
    fn test_load_applies_alias_env_overrides() {
        let _lock = lock_env();
        let _model = EnvVarGuard::set("AI_MODEL", "llama3:8b");
        let _port = EnvVarGuard::set("PORT", "9100");
        let _origins = EnvVarGuard::set(
            "ALLOWED_ORIGINS",
            r#"["http://localhost:3000","http://localhost:5173"]"#,
        );
        let _ollama = EnvVarGuard::set("OLLAMA_HOST", "http://gpu-box:11434");

        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();

        assert_eq!(config.provider.model, "llama3:8b");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.allowed_origins.len(), 2);
        assert_eq!(config.provider.api_base, "http://gpu-box:11434");
    }

    #[test]
    fn test_load_applies_path_env_overrides() {
        let _lock = lock_env();
        let _rollback = EnvVarGuard::set("CBT_ASSISTANT__AGENT__ROLLBACK_ON_FAILURE", "true");
        let _timeout = EnvVarGuard::set("CBT_ASSISTANT__PROVIDER__TIMEOUT_SECS", "15");
        let _temperature = EnvVarGuard::set("CBT_ASSISTANT__PROVIDER__TEMPERATURE", "0.4");

        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();

        assert!(config.agent.rollback_on_failure);
        assert_eq!(config.provider.timeout_secs, 15);
        let temperature = config.provider.temperature.unwrap();
        assert!((temperature - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_path_env_overrides_alias_and_file() {
        let _lock = lock_env();
        let _alias = EnvVarGuard::set("AI_MODEL", "from-alias");
        let _path = EnvVarGuard::set("CBT_ASSISTANT__PROVIDER__MODEL", "from-path");

        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.json"),
            r#"{"provider":{"model":"from-file"}}"#,
        )
        .unwrap();

        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();
        assert_eq!(config.provider.model, "from-path");
    }

    #[test]
    fn test_file_values_merge_over_defaults() {
        let _lock = lock_env();
        let _model = EnvVarGuard::unset("AI_MODEL");
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.json"),
            r#"{"agent":{"system_prompt":"Be brief."}}"#,
        )
        .unwrap();

        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();
        assert_eq!(config.agent.system_prompt, "Be brief.");
        assert_eq!(config.provider.model, "mistral:latest");
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let _lock = lock_env();
        let _timeout = EnvVarGuard::set("CBT_ASSISTANT__PROVIDER__TIMEOUT_SECS", "0");

        let temp_dir = TempDir::new().unwrap();
        let err = ConfigLoader::with_dir(temp_dir.path()).load().unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_set_path_value_creates_nested_objects() {
        let mut root = Value::Null;
        let path = vec!["a".to_string(), "b".to_string()];
        set_path_value(&mut root, &path, Value::from(1));
        assert_eq!(root, serde_json::json!({"a": {"b": 1}}));
    }
}
