use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{PwStoreError, Result};

/// User configuration, loaded from `.pwstore.toml`.
///
/// Every field has a sensible default so pwstore works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Database file used when neither `-f` nor `PWSTORE_DB_FILE` is given.
    #[serde(default = "default_db_file")]
    pub default_db_file: String,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// Seconds of inactivity before the interactive console re-locks.
    #[serde(default = "default_idle_lock_secs")]
    pub idle_lock_secs: u64,

    /// Console poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Seconds a retrieved password stays on the clipboard.
    #[serde(default = "default_clipboard_clear_secs")]
    pub clipboard_clear_secs: u64,

    /// Ask the user to confirm the last-modification date after opening.
    #[serde(default = "default_confirm_last_write")]
    pub confirm_last_write: bool,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_db_file() -> String {
    ".pwstore.crypt".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_idle_lock_secs() -> u64 {
    120
}

fn default_poll_interval_ms() -> u64 {
    150
}

fn default_clipboard_clear_secs() -> u64 {
    10
}

fn default_confirm_last_write() -> bool {
    true
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_db_file: default_db_file(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            idle_lock_secs: default_idle_lock_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            clipboard_clear_secs: default_clipboard_clear_secs(),
            confirm_last_write: default_confirm_last_write(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the working directory.
    const FILE_NAME: &'static str = ".pwstore.toml";

    /// Load settings from `<dir>/.pwstore.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            PwStoreError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        tracing::debug!(path = %config_path.display(), "loaded settings");
        Ok(settings)
    }

    /// Resolve the database path: an explicit path wins, otherwise the
    /// configured default relative to `dir`.
    pub fn db_path(&self, dir: &Path, explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) => path.to_path_buf(),
            None => dir.join(&self.default_db_file),
        }
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> crate::crypto::kdf::Argon2Params {
        crate::crypto::kdf::Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }

    pub fn idle_lock(&self) -> Duration {
        Duration::from_secs(self.idle_lock_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn clipboard_clear(&self) -> Duration {
        Duration::from_secs(self.clipboard_clear_secs)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.default_db_file, ".pwstore.crypt");
        assert_eq!(s.argon2_memory_kib, 65_536);
        assert_eq!(s.argon2_iterations, 3);
        assert_eq!(s.argon2_parallelism, 4);
        assert_eq!(s.idle_lock(), Duration::from_secs(120));
        assert_eq!(s.poll_interval(), Duration::from_millis(150));
        assert!(s.confirm_last_write);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.default_db_file, ".pwstore.crypt");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
default_db_file = "secrets.crypt"
argon2_memory_kib = 131072
argon2_iterations = 5
argon2_parallelism = 8
idle_lock_secs = 30
poll_interval_ms = 100
clipboard_clear_secs = 5
confirm_last_write = false
"#;
        fs::write(tmp.path().join(".pwstore.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.default_db_file, "secrets.crypt");
        assert_eq!(settings.argon2_memory_kib, 131_072);
        assert_eq!(settings.argon2_iterations, 5);
        assert_eq!(settings.argon2_parallelism, 8);
        assert_eq!(settings.idle_lock(), Duration::from_secs(30));
        assert_eq!(settings.clipboard_clear(), Duration::from_secs(5));
        assert!(!settings.confirm_last_write);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".pwstore.toml"), "idle_lock_secs = 60\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.idle_lock_secs, 60);
        assert_eq!(settings.default_db_file, ".pwstore.crypt");
        assert_eq!(settings.argon2_iterations, 3);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".pwstore.toml"), "not valid {{toml").unwrap();

        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn db_path_prefers_explicit_path() {
        let s = Settings::default();
        let dir = Path::new("/home/user");
        assert_eq!(
            s.db_path(dir, None),
            PathBuf::from("/home/user/.pwstore.crypt")
        );
        assert_eq!(
            s.db_path(dir, Some(Path::new("/tmp/other.crypt"))),
            PathBuf::from("/tmp/other.crypt")
        );
    }
}
