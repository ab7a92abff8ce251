// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use serde::Deserialize;
use std::path::PathBuf;

/// Configuration for one `bkpd` invocation: where state and chunk files
/// live, which bucket to upload to, and the encryption key. Loaded once at
/// startup from a TOML file; the encryption key may be overridden by an
/// environment variable so it never has to sit in the file on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Working directory for `queue.mp`/`current.mp`/`latest.mp`.
    pub state_dir: PathBuf,
    /// Root of the scratch area chunk files live under.
    pub temp_root: PathBuf,
    /// Object-storage bucket name.
    pub bucket: String,
    /// Object-storage endpoint (S3-compatible); `None` for AWS S3 itself.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Object-storage region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Chunk size in bytes; must be a nonzero power of two (e.g. 4 GiB).
    pub chunk_size: u64,
    /// 256-bit encryption key, base64-encoded. Overridden by
    /// `BKP_ENCRYPTION_KEY` when that variable is set, so the key need not
    /// be committed to the config file at all.
    #[serde(default)]
    encryption_key: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Env var name for the path to the config file.
const CONFIG_PATH_VAR: &str = "BKP_CONFIG";
/// Env var name overriding `encryption_key` from the config file.
const ENCRYPTION_KEY_VAR: &str = "BKP_ENCRYPTION_KEY";

impl Config {
    /// Resolves the config file path from `BKP_CONFIG`, falling back to
    /// `~/.config/bkp/config.toml`, and loads it.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read(path.clone(), e))?;
        let config: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse(path, e))?;
        Ok(config)
    }

    /// Decodes the effective encryption key, preferring the environment
    /// override over the config file's value.
    pub fn encryption_key(&self) -> Result<[u8; 32], ConfigError> {
        let env_override = std::env::var(ENCRYPTION_KEY_VAR).ok();
        Self::resolve_key(env_override, self.encryption_key.as_deref())
    }

    fn resolve_key(env_override: Option<String>, from_file: Option<&str>) -> Result<[u8; 32], ConfigError> {
        use base64::Engine;

        let encoded = env_override.as_deref().or(from_file).ok_or(ConfigError::MissingEncryptionKey)?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| ConfigError::MalformedEncryptionKey)?;
        bytes.try_into().map_err(|_| ConfigError::MalformedEncryptionKey)
    }
}

fn config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
        return Ok(PathBuf::from(path));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoConfigDir)?;
    Ok(PathBuf::from(home).join(".config/bkp/config.toml"))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no config directory: $HOME is unset and {CONFIG_PATH_VAR} is not set")]
    NoConfigDir,

    #[error("reading config file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("parsing config file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("no encryption key: set `encryption_key` in the config file or ${ENCRYPTION_KEY_VAR}")]
    MissingEncryptionKey,

    #[error("encryption key must decode to exactly 32 bytes")]
    MalformedEncryptionKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let toml = r#"
            state_dir = "/var/lib/bkp/state"
            temp_root = "/var/lib/bkp/tmp"
            bucket = "backups"
            chunk_size = 4294967296
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.bucket, "backups");
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.chunk_size, 4 * 1024 * 1024 * 1024);
    }

    #[test]
    fn env_override_wins_over_config_file_value() {
        let key_b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [7u8; 32]);
        let key = Config::resolve_key(Some(key_b64), Some("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=")).unwrap();
        assert_eq!(key, [7u8; 32]);
    }

    #[test]
    fn malformed_encryption_key_is_rejected() {
        assert!(Config::resolve_key(None, Some("not-base64!!")).is_err());
    }

    #[test]
    fn missing_encryption_key_is_rejected() {
        assert!(Config::resolve_key(None, None).is_err());
    }
}
