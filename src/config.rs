//! Configuration management
//!
//! Manages dashboard configuration: where the level store lives, which
//! upload columns are recognized, how content is generated and where the
//! HTTP server listens.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::content::llm::GEMINI_OPENAI_BASE_URL;
use crate::levels::IngestColumns;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Durable level store
    #[serde(default)]
    pub store: StoreConfig,
    /// Exam upload column names
    #[serde(default)]
    pub ingest: IngestColumns,
    /// Content generation and caching
    #[serde(default)]
    pub content: ContentConfig,
    /// HTTP server
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the student CSV
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("estudiantes.csv")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// OpenAI-compatible base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model id sent with each request
    #[serde(default = "default_model")]
    pub model: String,
    /// Optional response length cap
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum number of cached (student, concept, tier) entries
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Cache placeholder text after a failed generation
    #[serde(default)]
    pub cache_failures: bool,
    /// Drop a student's cached content whenever their levels change
    #[serde(default)]
    pub invalidate_on_write: bool,
    /// Environment variable consulted for the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_base_url() -> String {
    GEMINI_OPENAI_BASE_URL.to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_cache_capacity() -> usize {
    256
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
            cache_capacity: default_cache_capacity(),
            cache_failures: false,
            invalidate_on_write: false,
            api_key_env: default_api_key_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or the default location when `None`.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
            Self::from_toml(&contents)
                .with_context(|| format!("Failed to parse config file {}", config_path.display()))
        } else {
            Ok(Config::default())
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save configuration to `path`, or the default location when `None`
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;

        Ok(config_path)
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "flipped-tutor", "flipped-tutor")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Show current configuration
pub fn show_config(config: &Config) {
    println!("Level store:       {}", config.store.path.display());
    println!("Student id columns: {}", config.ingest.student_id_columns.join(", "));
    println!("Score columns:      {}", config.ingest.score_columns.join(", "));
    println!("Content endpoint:   {}", config.content.base_url);
    println!("Content model:      {}", config.content.model);
    println!("Request timeout:    {}s", config.content.timeout_secs);
    println!("Cache capacity:     {}", config.content.cache_capacity);
    println!("Cache failures:     {}", if config.content.cache_failures { "yes" } else { "no" });
    println!("Invalidate on write: {}", if config.content.invalidate_on_write { "yes" } else { "no" });
    println!("Server:             {}:{}", config.server.host, config.server.port);
    println!(
        "API key:            {}",
        if crate::security::has_api_key(&config.content.api_key_env) { "configured" } else { "not configured" }
    );
}

/// Get default configuration as TOML string
pub fn default_config_toml() -> String {
    let config = Config::default();
    toml::to_string_pretty(&config).unwrap_or_else(|_| "# Default configuration\n".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.store.path, PathBuf::from("estudiantes.csv"));
        assert_eq!(config.content.model, "gemini-1.5-flash");
        assert_eq!(config.content.timeout_secs, 30);
        assert!(!config.content.cache_failures);
        assert_eq!(config.server.port, 8080);
        assert!(config.ingest.student_id_columns.contains(&"ID de Estudiante".to_string()));
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml(
            r#"
            [store]
            path = "/data/levels.csv"

            [ingest]
            score_columns = ["Score"]

            [content]
            cache_failures = true
            "#,
        )
        .unwrap();
        assert_eq!(config.store.path, PathBuf::from("/data/levels.csv"));
        assert_eq!(config.ingest.score_columns, vec!["Score".to_string()]);
        assert_eq!(config.ingest.student_id_columns, IngestColumns::default().student_id_columns);
        assert!(config.content.cache_failures);
        assert_eq!(config.content.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn test_ingest_column_keys() {
        let config = Config::from_toml(
            r#"
            [ingest]
            student_id_columns = ["Matricule"]
            score_columns = ["Note"]
            "#,
        )
        .unwrap();
        assert_eq!(config.ingest.student_id_columns, vec!["Matricule".to_string()]);
        assert_eq!(config.ingest.score_columns, vec!["Note".to_string()]);

        // A misspelled key is an error rather than a silent fallback to defaults
        assert!(Config::from_toml("[ingest]\nstudent_id = [\"Matricule\"]\n").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.server.port = 9090;

        config.save(Some(&path)).unwrap();
        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.server.port, 9090);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(loaded.content.cache_capacity, 256);
    }

    #[test]
    fn test_default_toml_parses() {
        let toml = default_config_toml();
        assert!(Config::from_toml(&toml).is_ok());
    }
}
