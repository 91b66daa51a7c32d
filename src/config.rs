//! Persistent configuration.
//!
//! Configuration is a JSON document of sections, each a map of options,
//! loaded from:
//! 1. `$THROW_CONFIG` (environment variable)
//! 2. `~/.config/throw/throw.json` (Linux)
//!    `%APPDATA%\throw\throw.json` (Windows)
//!
//! Options that were never stored fall back to the defaults of the typed
//! section structs below ([`SmtpConfig`], [`GalleryConfig`],
//! [`DispatchConfig`]). The `user` section has no defaults.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, ThrowError};

/// Key-value configuration with per-section defaults.
pub trait ConfigStore {
    /// Stored value for `section.option`, else its default, else `None`.
    fn get(&self, section: &str, option: &str) -> Option<Value>;

    /// Store `section.option` and persist the change.
    fn set(&mut self, section: &str, option: &str, value: Value) -> Result<()>;

    /// All options of `section`: stored values merged over the defaults.
    fn section_with_defaults(&self, section: &str) -> Map<String, Value>;

    /// Like [`ConfigStore::get`], as a string. Non-string values are rejected.
    fn get_string(&self, section: &str, option: &str) -> Result<String> {
        match self.get(section, option) {
            Some(Value::String(s)) => Ok(s),
            _ => Err(ThrowError::missing(section, option)),
        }
    }
}

// ── Typed sections ──────────────────────────────────────────────

/// SMTP submission settings (`smtp` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// Hostname of the SMTP server used when the local relay is unavailable.
    pub host: Option<String>,
    /// Port of the SMTP server.
    pub port: u16,
    /// Upgrade the connection with STARTTLS.
    pub use_tls: bool,
    /// Connect with implicit TLS (SMTPS).
    pub use_ssl: bool,
    /// Authenticate with this username.
    pub username: Option<String>,
    /// Authenticate with this password.
    pub password: Option<String>,
    /// Try an unauthenticated relay on `localhost:25` first.
    pub try_local_relay: bool,
}

/// Remote gallery endpoints (`gallery` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    /// Base URL of the JSON API.
    pub api_base: String,
    /// Base URL of public gallery pages.
    pub page_base: String,
    /// Base URL of direct item downloads.
    pub item_base: String,
}

/// Dispatch policy (`dispatch` section).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Send a message even when no file survived path expansion.
    pub allow_empty: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 25,
            use_tls: false,
            use_ssl: false,
            username: None,
            password: None,
            try_local_relay: true,
        }
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            api_base: "http://min.us/api".to_string(),
            page_base: "http://min.us".to_string(),
            item_base: "http://i.min.us".to_string(),
        }
    }
}

impl SmtpConfig {
    /// Read the `smtp` section.
    pub fn from_store(store: &dyn ConfigStore) -> Result<Self> {
        typed_section(store, "smtp")
    }
}

impl GalleryConfig {
    /// Read the `gallery` section.
    pub fn from_store(store: &dyn ConfigStore) -> Result<Self> {
        typed_section(store, "gallery")
    }
}

impl DispatchConfig {
    /// Read the `dispatch` section.
    pub fn from_store(store: &dyn ConfigStore) -> Result<Self> {
        typed_section(store, "dispatch")
    }
}

fn typed_section<T: DeserializeOwned>(store: &dyn ConfigStore, section: &str) -> Result<T> {
    let map = store.section_with_defaults(section);
    serde_json::from_value(Value::Object(map)).map_err(|e| ThrowError::Config {
        path: PathBuf::from(format!("[{section}]")),
        reason: e.to_string(),
    })
}

/// Default option values for a section. Options without a default are absent.
pub fn section_defaults(section: &str) -> Map<String, Value> {
    let value = match section {
        "smtp" => serde_json::to_value(SmtpConfig::default()),
        "gallery" => serde_json::to_value(GalleryConfig::default()),
        "dispatch" => serde_json::to_value(DispatchConfig::default()),
        _ => return Map::new(),
    };
    match value {
        Ok(Value::Object(map)) => map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
        _ => Map::new(),
    }
}

// ── JSON store ──────────────────────────────────────────────────

/// A [`ConfigStore`] kept as a JSON document on disk.
#[derive(Debug, Clone, Default)]
pub struct JsonConfigStore {
    /// Where changes are written. `None` keeps the store in memory only.
    path: Option<PathBuf>,
    document: Map<String, Value>,
}

impl JsonConfigStore {
    /// Load the store from `path`. A missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = if path.exists() {
            let contents =
                std::fs::read_to_string(&path).map_err(|e| ThrowError::io(&path, e))?;
            match serde_json::from_str::<Value>(&contents) {
                Ok(Value::Object(map)) => {
                    tracing::info!(path = %path.display(), "Loaded configuration");
                    map
                }
                Ok(_) => {
                    return Err(ThrowError::Config {
                        path,
                        reason: "top level is not a JSON object".to_string(),
                    })
                }
                Err(e) => {
                    return Err(ThrowError::Config {
                        path,
                        reason: e.to_string(),
                    })
                }
            }
        } else {
            tracing::info!(path = %path.display(), "No configuration file, starting blank");
            Map::new()
        };

        Ok(Self {
            path: Some(path),
            document,
        })
    }

    /// Load the store from the standard location.
    pub fn open_default() -> Result<Self> {
        let path = config_file_path().ok_or_else(|| ThrowError::Config {
            path: PathBuf::from("<config dir>"),
            reason: "could not determine the configuration directory".to_string(),
        })?;
        Self::open(path)
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn sync(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ThrowError::io(parent, e))?;
        }

        let contents = serde_json::to_string_pretty(&self.document).map_err(|e| {
            ThrowError::Config {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;
        std::fs::write(path, contents).map_err(|e| ThrowError::io(path, e))?;
        tracing::info!(path = %path.display(), "Saved configuration");
        Ok(())
    }
}

impl ConfigStore for JsonConfigStore {
    fn get(&self, section: &str, option: &str) -> Option<Value> {
        self.document
            .get(section)
            .and_then(|s| s.get(option))
            .filter(|v| !v.is_null())
            .cloned()
            .or_else(|| section_defaults(section).remove(option))
    }

    fn set(&mut self, section: &str, option: &str, value: Value) -> Result<()> {
        let entry = self
            .document
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(option.to_string(), value);
        }
        self.sync()
    }

    fn section_with_defaults(&self, section: &str) -> Map<String, Value> {
        let mut merged = section_defaults(section);
        if let Some(Value::Object(stored)) = self.document.get(section) {
            for (k, v) in stored {
                if !v.is_null() {
                    merged.insert(k.clone(), v.clone());
                }
            }
        }
        merged
    }
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("THROW_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("throw").join("throw.json"))
}

/// Return the cache directory used for logs.
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("throw")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_when_blank() {
        let store = JsonConfigStore::in_memory();
        assert_eq!(store.get("smtp", "port"), Some(json!(25)));
        assert_eq!(store.get("smtp", "use_ssl"), Some(json!(false)));
        assert_eq!(store.get("smtp", "host"), None);
        assert_eq!(store.get("user", "name"), None);
        assert_eq!(store.path(), None);
    }

    #[test]
    fn test_missing_user_option_is_an_error() {
        let store = JsonConfigStore::in_memory();
        let err = store.get_string("user", "email").unwrap_err();
        assert!(matches!(err, ThrowError::MissingConfig { .. }));
    }

    #[test]
    fn test_stored_value_overrides_default() {
        let mut store = JsonConfigStore::in_memory();
        store.set("smtp", "port", json!(465)).unwrap();
        store.set("smtp", "host", json!("mail.example.com")).unwrap();

        let smtp = SmtpConfig::from_store(&store).unwrap();
        assert_eq!(smtp.port, 465);
        assert_eq!(smtp.host.as_deref(), Some("mail.example.com"));
        assert!(smtp.try_local_relay);
    }

    #[test]
    fn test_section_with_defaults_merges() {
        let mut store = JsonConfigStore::in_memory();
        store.set("gallery", "api_base", json!("http://localhost:9/api")).unwrap();

        let section = store.section_with_defaults("gallery");
        assert_eq!(section["api_base"], json!("http://localhost:9/api"));
        assert_eq!(section["page_base"], json!("http://min.us"));
    }

    #[test]
    fn test_persist_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("throw.json");

        let mut store = JsonConfigStore::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        store.set("user", "name", json!("Ada Lovelace")).unwrap();
        store.set("user", "email", json!("ada@example.com")).unwrap();
        assert!(path.exists());

        let reloaded = JsonConfigStore::open(&path).unwrap();
        assert_eq!(reloaded.get_string("user", "name").unwrap(), "Ada Lovelace");

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains('\n'), "config should be pretty-printed");
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("throw.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonConfigStore::open(&path).unwrap_err();
        assert!(matches!(err, ThrowError::Config { .. }));
    }

    #[test]
    fn test_dispatch_allow_empty_defaults_off() {
        let store = JsonConfigStore::in_memory();
        assert!(!DispatchConfig::from_store(&store).unwrap().allow_empty);
    }
}
