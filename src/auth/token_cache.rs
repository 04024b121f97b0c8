use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

use super::AuthError;

/// Tokens must stay valid at least this long to be reused.
const EXPIRY_MARGIN_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCache {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl TokenCache {
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in_seconds: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: now + Duration::seconds(expires_in_seconds),
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now >= Duration::seconds(EXPIRY_MARGIN_SECONDS)
    }

    /// A missing or unreadable cache is treated as empty.
    pub fn load(path: &Path) -> Option<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No token cache at {:?}: {}", path, e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!("Ignoring unreadable token cache {:?}: {}", path, e);
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), AuthError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AuthError::Cache(format!("cannot create {parent:?}: {e}")))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AuthError::Cache(format!("cannot serialize: {e}")))?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(path)
            .map_err(|e| AuthError::Cache(format!("cannot open {path:?}: {e}")))?;

        // `mode` only applies on creation; tighten an older file before the
        // tokens land in it.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| AuthError::Cache(format!("cannot restrict {path:?}: {e}")))?;
        }

        file.write_all(content.as_bytes())
            .map_err(|e| AuthError::Cache(format!("cannot write {path:?}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_validity_margin() {
        let cache = TokenCache::new("at".into(), None, 120, now());
        assert!(cache.is_valid_at(now()));
        assert!(cache.is_valid_at(now() + Duration::seconds(60)));
        assert!(!cache.is_valid_at(now() + Duration::seconds(61)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub").join("token_cache.json");
        let cache = TokenCache::new("at".into(), Some("rt".into()), 3600, now());

        cache.save(&path).unwrap();
        assert_eq!(TokenCache::load(&path), Some(cache));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_save_restricts_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token_cache.json");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let cache = TokenCache::new("at".into(), Some("rt".into()), 3600, now());
        cache.save(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(TokenCache::load(&path), Some(cache));
    }

    #[test]
    fn test_corrupt_cache_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token_cache.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(TokenCache::load(&path), None);
    }
}
