//! Configuration management
//!
//! `settings.json` in the data directory:
//! ```json
//! {
//!   "app": { "importedBy": "ops@clinic.example" },
//!   "backend": { "kind": "rest", "url": "https://xyz.example.co", "apiKey": "..." }
//! }
//! ```
//! Keys this crate does not manage are kept when saving.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const SETTINGS_FILE: &str = "settings.json";

/// Which store backs the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// DuckDB file in the data directory
    #[default]
    Local,
    /// Hosted PostgREST-compatible API
    Rest,
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "duckdb" => Ok(BackendKind::Local),
            "rest" | "hosted" => Ok(BackendKind::Rest),
            other => bail!("Unknown backend '{}': expected 'local' or 'rest'", other),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    backend: BackendSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    imported_by: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackendSettings {
    #[serde(default)]
    kind: BackendKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Resolved configuration (settings file plus environment overrides)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub backend: BackendKind,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    /// Attribution for imports when the caller gives none
    pub imported_by: Option<String>,
    /// Values as resolved by `load`; `save` only writes fields that differ
    loaded: Resolved,
    /// Set by `use_local`/`use_rest`: the backend section is written as-is
    backend_chosen: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Resolved {
    backend: BackendKind,
    api_url: Option<String>,
    api_key: Option<String>,
    imported_by: Option<String>,
}

impl Config {
    /// Load config from the data directory.
    ///
    /// Overrides: `LEADDESK_BACKEND`, `LEADDESK_API_URL`, `LEADDESK_API_KEY`,
    /// `LEADDESK_IMPORTED_BY`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        Self::load_with_env(data_dir, |key| std::env::var(key).ok())
    }

    fn load_with_env(data_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw = read_settings(data_dir)?;

        let backend = match env("LEADDESK_BACKEND").filter(|v| !v.is_empty()) {
            Some(value) => value.parse()?,
            None => raw.backend.kind,
        };

        let loaded = Resolved {
            backend,
            api_url: env("LEADDESK_API_URL").or(raw.backend.url),
            api_key: env("LEADDESK_API_KEY").or(raw.backend.api_key),
            imported_by: env("LEADDESK_IMPORTED_BY").or(raw.app.imported_by),
        };

        Ok(Self {
            backend: loaded.backend,
            api_url: loaded.api_url.clone(),
            api_key: loaded.api_key.clone(),
            imported_by: loaded.imported_by.clone(),
            loaded,
            backend_chosen: false,
        })
    }

    /// Save config to the data directory, preserving keys it does not manage.
    ///
    /// Only fields changed since `load` are written, so environment
    /// overrides never end up in the settings file.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = read_settings(data_dir)?;

        if self.imported_by != self.loaded.imported_by {
            settings.app.imported_by = self.imported_by.clone();
        }
        if self.backend_chosen || self.backend != self.loaded.backend {
            settings.backend.kind = self.backend;
        }
        let rest_chosen = self.backend_chosen && self.backend == BackendKind::Rest;
        if rest_chosen || self.api_url != self.loaded.api_url {
            settings.backend.url = self.api_url.clone();
        }
        if rest_chosen || self.api_key != self.loaded.api_key {
            settings.backend.api_key = self.api_key.clone();
        }

        std::fs::create_dir_all(data_dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    pub fn use_local(&mut self) {
        self.backend = BackendKind::Local;
        self.backend_chosen = true;
    }

    pub fn use_rest(&mut self, url: impl Into<String>, api_key: impl Into<String>) {
        self.backend = BackendKind::Rest;
        self.backend_chosen = true;
        self.api_url = Some(url.into());
        self.api_key = Some(api_key.into());
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    match serde_json::from_str(&content) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            warn!(path = %settings_path.display(), error = %e, "ignoring unreadable settings file");
            Ok(SettingsFile::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_with_env(dir.path(), no_env).unwrap();
        assert_eq!(config.backend, BackendKind::Local);
        assert!(config.api_url.is_none());
        assert!(config.imported_by.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.use_rest("https://crm.example.com", "secret");
        config.imported_by = Some("front-desk".to_string());
        config.save(dir.path()).unwrap();

        let loaded = Config::load_with_env(dir.path(), no_env).unwrap();
        assert_eq!(loaded.backend, BackendKind::Rest);
        assert_eq!(loaded.api_url.as_deref(), Some("https://crm.example.com"));
        assert_eq!(loaded.api_key.as_deref(), Some("secret"));
        assert_eq!(loaded.imported_by.as_deref(), Some("front-desk"));
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"app":{"theme":"dark"},"dashboard":{"pinned":["calls"]}}"#,
        )
        .unwrap();

        let mut config = Config::load_with_env(dir.path(), no_env).unwrap();
        config.imported_by = Some("ops".to_string());
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["app"]["theme"], "dark");
        assert_eq!(json["app"]["importedBy"], "ops");
        assert_eq!(json["dashboard"]["pinned"][0], "calls");
        assert_eq!(json["backend"]["kind"], "local");
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.imported_by = Some("file".to_string());
        config.save(dir.path()).unwrap();

        let loaded = Config::load_with_env(dir.path(), |key| match key {
            "LEADDESK_BACKEND" => Some("rest".to_string()),
            "LEADDESK_IMPORTED_BY" => Some("env".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(loaded.backend, BackendKind::Rest);
        assert_eq!(loaded.imported_by.as_deref(), Some("env"));
    }

    #[test]
    fn test_save_does_not_persist_env_overrides() {
        let dir = TempDir::new().unwrap();
        let env = |key: &str| match key {
            "LEADDESK_BACKEND" => Some("rest".to_string()),
            "LEADDESK_API_URL" => Some("https://env.example.com".to_string()),
            "LEADDESK_API_KEY" => Some("env-only-secret".to_string()),
            _ => None,
        };

        let mut config = Config::load_with_env(dir.path(), env).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("env-only-secret"));
        config.imported_by = Some("ops".to_string());
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        assert!(!content.contains("env-only-secret"));
        assert!(!content.contains("env.example.com"));

        let reloaded = Config::load_with_env(dir.path(), no_env).unwrap();
        assert_eq!(reloaded.backend, BackendKind::Local);
        assert!(reloaded.api_key.is_none());
        assert_eq!(reloaded.imported_by.as_deref(), Some("ops"));
    }

    #[test]
    fn test_explicit_backend_choice_is_saved_under_env_override() {
        let dir = TempDir::new().unwrap();
        let env = |key: &str| (key == "LEADDESK_BACKEND").then(|| "rest".to_string());

        let mut config = Config::load_with_env(dir.path(), env).unwrap();
        config.use_rest("https://crm.example.com", "file-secret");
        config.save(dir.path()).unwrap();

        let reloaded = Config::load_with_env(dir.path(), no_env).unwrap();
        assert_eq!(reloaded.api_url.as_deref(), Some("https://crm.example.com"));
        assert_eq!(reloaded.api_key.as_deref(), Some("file-secret"));
        assert_eq!(reloaded.backend, BackendKind::Rest);
    }

    #[test]
    fn test_bad_backend_value() {
        let dir = TempDir::new().unwrap();
        let result = Config::load_with_env(dir.path(), |key| {
            (key == "LEADDESK_BACKEND").then(|| "sqlite".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_corrupt_settings_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{not json").unwrap();
        let config = Config::load_with_env(dir.path(), no_env).unwrap();
        assert_eq!(config.backend, BackendKind::Local);
    }
}
