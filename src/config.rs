//! Configuration management.
//!
//! Resolves where the local cache database lives and how to reach the
//! remote store. All persisted state is disposable: if the cache file is
//! missing, collections default to empty and the next sync pass repopulates
//! them.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Get the global Crewdeck directory location (`~/.crewdeck`).
#[must_use]
pub fn global_crewdeck_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".crewdeck"))
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `CREWDECK_TEST_DB=1` (or any non-empty
/// value other than `0`/`false`). This redirects cache operations to an
/// isolated test database.
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("CREWDECK_TEST_DB")
        .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false)
}

/// Get the test cache database path (`~/.crewdeck/test/crewdeck.db`).
#[must_use]
pub fn test_cache_path() -> Option<PathBuf> {
    global_crewdeck_dir().map(|dir| dir.join("test").join("crewdeck.db"))
}

/// Resolve the cache database path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `CREWDECK_TEST_DB` environment variable → uses test database
/// 3. `CREWDECK_DB` environment variable
/// 4. Global location: `~/.crewdeck/data/crewdeck.db`
#[must_use]
pub fn resolve_cache_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_cache_path();
    }

    if let Ok(db_path) = std::env::var("CREWDECK_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    global_crewdeck_dir().map(|dir| dir.join("data").join("crewdeck.db"))
}

/// Remote store connection settings.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the remote tabular store API.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub api_key: String,
}

impl RemoteConfig {
    /// Build a config from explicit values, falling back to the
    /// `CREWDECK_REMOTE_URL` / `CREWDECK_API_KEY` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if no base URL can be resolved. A missing
    /// API key resolves to an empty string (some deployments are open).
    pub fn resolve(base_url: Option<&str>, api_key: Option<&str>) -> Result<Self> {
        let base_url = match base_url {
            Some(url) => url.to_string(),
            None => std::env::var("CREWDECK_REMOTE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    Error::Config("no remote URL: pass one or set CREWDECK_REMOTE_URL".to_string())
                })?,
        };

        let api_key = match api_key {
            Some(key) => key.to_string(),
            None => std::env::var("CREWDECK_API_KEY").unwrap_or_default(),
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_cache_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/cache.db");
        let result = resolve_cache_path(Some(&explicit));
        assert_eq!(result, Some(explicit));
    }

    #[test]
    fn test_global_dir_returns_some() {
        assert!(global_crewdeck_dir().is_some());
    }

    #[test]
    fn test_test_cache_path_is_separate() {
        let global = global_crewdeck_dir().unwrap();
        let test = test_cache_path().unwrap();

        assert!(test.to_string_lossy().contains("/test/"));
        assert_ne!(global.join("data").join("crewdeck.db"), test);
    }

    #[test]
    fn test_remote_config_trims_trailing_slash() {
        let config = RemoteConfig::resolve(Some("https://api.example.com/"), Some("k")).unwrap();
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.api_key, "k");
    }
}
