//! Keyring integration for secure API key storage
//! Falls back to a 0600 file, then to an environment variable

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

const SERVICE_NAME: &str = "flipped-tutor";
const API_KEY_USERNAME: &str = "content-api-key";
const API_KEY_FILE: &str = "api_key.txt";

/// Where a resolved API key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Keyring,
    File,
    Environment,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Keyring => write!(f, "keyring"),
            KeySource::File => write!(f, "key file"),
            KeySource::Environment => write!(f, "environment"),
        }
    }
}

/// Get the path for the fallback API key file
fn api_key_file_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "flipped-tutor", "flipped-tutor")
        .context("Failed to get project directories")?;
    let dir = base.config_dir();
    fs::create_dir_all(dir).context("Failed to create config directory")?;
    Ok(dir.join(API_KEY_FILE))
}

/// Set API key - tries keyring first, falls back to file
pub fn set_api_key(key: &str) -> Result<()> {
    if let Ok(entry) = keyring::Entry::new(SERVICE_NAME, API_KEY_USERNAME) {
        if entry.set_password(key).is_ok() {
            // Also save to file in case keyring retrieval fails later
            let _ = save_to_file(key);
            return Ok(());
        }
    }

    save_to_file(key)?;
    info!("Keyring unavailable, API key stored in file");
    Ok(())
}

fn save_to_file(key: &str) -> Result<()> {
    let path = api_key_file_path()?;
    fs::write(&path, key).context("Failed to write API key file")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
            .context("Failed to set file permissions")?;
    }

    Ok(())
}

fn from_keyring() -> Option<String> {
    keyring::Entry::new(SERVICE_NAME, API_KEY_USERNAME)
        .ok()
        .and_then(|entry| entry.get_password().ok())
        .filter(|k| !k.trim().is_empty())
}

fn from_file() -> Option<String> {
    let path = api_key_file_path().ok()?;
    fs::read_to_string(path)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

fn from_env(env_var: &str) -> Option<String> {
    std::env::var(env_var)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Resolve the API key: keyring, then key file, then `env_var`
pub fn resolve_api_key(env_var: &str) -> Option<(String, KeySource)> {
    let resolved = from_keyring()
        .map(|k| (k, KeySource::Keyring))
        .or_else(|| from_file().map(|k| (k, KeySource::File)))
        .or_else(|| from_env(env_var).map(|k| (k, KeySource::Environment)));

    if let Some((_, source)) = &resolved {
        debug!("API key resolved from {}", source);
    }
    resolved
}

/// Get API key or fail with setup guidance
pub fn get_api_key(env_var: &str) -> Result<String> {
    resolve_api_key(env_var)
        .map(|(key, _)| key)
        .with_context(|| {
            format!(
                "Content API key is not configured. Run 'flipped-tutor config --set-api-key YOUR_KEY' \
                 or set the {} environment variable.",
                env_var
            )
        })
}

/// Delete API key from both keyring and file
pub fn delete_api_key() -> Result<()> {
    if let Ok(entry) = keyring::Entry::new(SERVICE_NAME, API_KEY_USERNAME) {
        let _ = entry.delete_credential();
    }

    let path = api_key_file_path()?;
    if path.exists() {
        fs::remove_file(&path).context("Failed to delete API key file")?;
    }

    Ok(())
}

/// Check if an API key is available from any source
pub fn has_api_key(env_var: &str) -> bool {
    resolve_api_key(env_var).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_ignores_blank() {
        std::env::set_var("FLIPPED_TUTOR_TEST_BLANK_KEY", "   ");
        assert_eq!(from_env("FLIPPED_TUTOR_TEST_BLANK_KEY"), None);
        std::env::remove_var("FLIPPED_TUTOR_TEST_BLANK_KEY");
    }

    #[test]
    fn test_from_env_trims() {
        std::env::set_var("FLIPPED_TUTOR_TEST_KEY", " abc123\n");
        assert_eq!(from_env("FLIPPED_TUTOR_TEST_KEY"), Some("abc123".to_string()));
        std::env::remove_var("FLIPPED_TUTOR_TEST_KEY");
    }

    #[test]
    fn test_key_source_display() {
        assert_eq!(KeySource::Environment.to_string(), "environment");
    }
}
