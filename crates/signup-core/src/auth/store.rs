use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::cookie::Cookie;

/// Cookie jar file name in cache directory
const COOKIE_FILE: &str = "cookies.json";

/// Process-wide cookie storage.
///
/// Expired cookies are treated as absent. Writes are last-write-wins.
pub trait CookieStore: Send + Sync {
    /// Get a live cookie by name
    fn get(&self, name: &str) -> Option<Cookie>;

    /// Store a cookie, replacing any cookie with the same name
    fn set(&self, cookie: Cookie) -> Result<()>;

    /// All live cookies as a `a=b; c=d` string
    fn cookie_string(&self) -> String;
}

/// Write a root-path cookie that expires after `days`
pub fn set_cookie(store: &dyn CookieStore, name: &str, value: &str, days: i64) -> Result<()> {
    store.set(Cookie::with_days(name, value, days))
}

/// In-memory jar holding serialized cookies, parsed back on every read.
#[derive(Default)]
pub struct MemoryCookieStore {
    jar: RwLock<BTreeMap<String, String>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_serialized(entries: Vec<String>) -> Self {
        let jar = entries
            .into_iter()
            .filter_map(|raw| Cookie::parse(&raw).map(|c| (c.name, raw)))
            .collect();
        Self { jar: RwLock::new(jar) }
    }

    /// Serialized form of every stored cookie, expired or not
    fn snapshot(&self) -> Vec<String> {
        let jar = self.jar.read().unwrap_or_else(PoisonError::into_inner);
        jar.values().cloned().collect()
    }

    /// Remove `name` only if it still holds `raw`, so a cookie stored by
    /// another thread since `raw` was read is kept.
    fn remove_if_unchanged(&self, name: &str, raw: &str) -> bool {
        let mut jar = self.jar.write().unwrap_or_else(PoisonError::into_inner);
        if jar.get(name).map(String::as_str) == Some(raw) {
            jar.remove(name);
            true
        } else {
            false
        }
    }
}

impl CookieStore for MemoryCookieStore {
    fn get(&self, name: &str) -> Option<Cookie> {
        let raw = {
            let jar = self.jar.read().unwrap_or_else(PoisonError::into_inner);
            jar.get(name).cloned()?
        };
        let cookie = Cookie::parse(&raw)?;
        if cookie.is_expired() {
            if self.remove_if_unchanged(name, &raw) {
                debug!(cookie = name, "Evicted expired cookie");
                return None;
            }
            // Replaced concurrently; read the new value
            return self.get(name);
        }
        Some(cookie)
    }

    fn set(&self, cookie: Cookie) -> Result<()> {
        let mut jar = self.jar.write().unwrap_or_else(PoisonError::into_inner);
        jar.insert(cookie.name.clone(), cookie.to_header_string());
        Ok(())
    }

    fn cookie_string(&self) -> String {
        self.snapshot()
            .iter()
            .filter_map(|raw| Cookie::parse(raw))
            .filter(|c| !c.is_expired())
            .map(|c| c.pair())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Cookie jar persisted as JSON in the cache directory.
pub struct FileCookieStore {
    path: PathBuf,
    inner: MemoryCookieStore,
}

impl FileCookieStore {
    /// Open the jar in `cache_dir`, loading any cookies saved by a previous run.
    ///
    /// A jar that does not parse is discarded: it only caches tokens, so
    /// starting empty just means a new token is issued.
    pub fn open(cache_dir: &Path) -> Result<Self> {
        let path = cache_dir.join(COOKIE_FILE);
        let inner = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context("Failed to read cookie file")?;
            match serde_json::from_str::<Vec<String>>(&contents) {
                Ok(entries) => {
                    debug!(count = entries.len(), "Loaded persisted cookies");
                    MemoryCookieStore::from_serialized(entries)
                }
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "Discarding unreadable cookie file");
                    MemoryCookieStore::new()
                }
            }
        } else {
            MemoryCookieStore::new()
        };
        Ok(Self { path, inner })
    }

    /// Write the jar through a temp file in the same directory, then rename
    /// it into place so a crash never leaves a partial file behind.
    fn save(&self) -> Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Cookie file has no parent directory"))?;
        std::fs::create_dir_all(dir)?;

        let contents = serde_json::to_string_pretty(&self.inner.snapshot())?;
        let mut tmp = NamedTempFile::new_in(dir).context("Failed to create temp cookie file")?;
        tmp.write_all(contents.as_bytes())
            .context("Failed to write cookie file")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .context("Failed to replace cookie file")?;
        Ok(())
    }
}

impl CookieStore for FileCookieStore {
    fn get(&self, name: &str) -> Option<Cookie> {
        self.inner.get(name)
    }

    fn set(&self, cookie: Cookie) -> Result<()> {
        self.inner.set(cookie)?;
        self.save()
    }

    fn cookie_string(&self) -> String {
        self.inner.cookie_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::cookie::get_cookie;
    use chrono::{Duration, Utc};

    #[test]
    fn test_memory_round_trip() {
        let store = MemoryCookieStore::new();
        set_cookie(&store, "auth_token", "v;a=l=ue", 1).unwrap();

        let cookie = store.get("auth_token").expect("cookie should be present");
        assert_eq!(cookie.value, "v;a=l=ue");
        assert_eq!(cookie.path, "/");
    }

    #[test]
    fn test_memory_last_write_wins() {
        let store = MemoryCookieStore::new();
        set_cookie(&store, "auth_token", "first", 1).unwrap();
        set_cookie(&store, "auth_token", "second", 1).unwrap();

        assert_eq!(store.get("auth_token").unwrap().value, "second");
        assert_eq!(store.cookie_string(), "auth_token=second");
    }

    #[test]
    fn test_expired_cookie_is_absent() {
        let store = MemoryCookieStore::new();
        let mut cookie = Cookie::with_days("auth_token", "old", 1);
        cookie.expires = Some(Utc::now() - Duration::days(1));
        store.set(cookie).unwrap();

        assert!(store.get("auth_token").is_none());
        assert_eq!(store.cookie_string(), "");
        assert!(store.snapshot().is_empty(), "expired cookie should be evicted");
    }

    #[test]
    fn test_cookie_string_lists_live_cookies() {
        let store = MemoryCookieStore::new();
        set_cookie(&store, "b", "2", 1).unwrap();
        set_cookie(&store, "a", "x y", 1).unwrap();

        assert_eq!(store.cookie_string(), "a=x%20y; b=2");
        assert_eq!(get_cookie(&store.cookie_string(), "a").as_deref(), Some("x y"));
    }

    #[test]
    fn test_file_store_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = FileCookieStore::open(dir.path()).unwrap();
            set_cookie(&store, "auth_token", "tok;en=", 1).unwrap();
        }

        let reopened = FileCookieStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("auth_token").unwrap().value, "tok;en=");
    }

    #[test]
    fn test_file_store_recovers_from_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileCookieStore::open(dir.path()).unwrap();
            set_cookie(&store, "auth_token", "tok;en=", 1).unwrap();
        }

        // Simulate a crash halfway through an old non-atomic write
        let path = dir.path().join(COOKIE_FILE);
        let contents = std::fs::read(&path).unwrap();
        std::fs::write(&path, &contents[..contents.len() / 2]).unwrap();

        let store = FileCookieStore::open(dir.path()).expect("corrupt jar should open empty");
        assert!(store.get("auth_token").is_none());
        assert_eq!(store.cookie_string(), "");

        // The recovered jar is usable and rewrites a valid file
        set_cookie(&store, "auth_token", "fresh", 1).unwrap();
        let reopened = FileCookieStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("auth_token").unwrap().value, "fresh");
    }

    #[test]
    fn test_file_store_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCookieStore::open(dir.path()).unwrap();
        set_cookie(&store, "a", "1", 1).unwrap();
        set_cookie(&store, "b", "2", 1).unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![COOKIE_FILE.to_string()]);
    }

    #[test]
    fn test_eviction_keeps_concurrently_stored_cookie() {
        let store = MemoryCookieStore::new();
        let mut stale = Cookie::with_days("auth_token", "old", 1);
        stale.expires = Some(Utc::now() - Duration::days(1));
        let stale_raw = stale.to_header_string();
        store.set(stale).unwrap();

        // Another writer stores a fresh token after the expired one was read
        set_cookie(&store, "auth_token", "fresh", 1).unwrap();

        assert!(!store.remove_if_unchanged("auth_token", &stale_raw));
        assert_eq!(store.get("auth_token").unwrap().value, "fresh");
    }
}
