use crate::config::AppConfig;
use crate::error::CredentialError;
use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};
use url::Url;

pub const PLATFORM_COOKIE_DOMAIN: &str = "pro.yuketang.cn";

/// Source of the cookie string that authenticates every platform request.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    fn describe(&self) -> String;

    async fn get_credential(&self) -> Result<String, CredentialError>;
}

/// A cookie string pasted straight into the config.
pub struct StaticCookie {
    cookie: String,
}

impl StaticCookie {
    pub fn new(cookie: impl Into<String>) -> Self {
        Self { cookie: cookie.into() }
    }
}

#[async_trait]
impl CredentialProvider for StaticCookie {
    fn describe(&self) -> String {
        "cookie from config".to_string()
    }

    async fn get_credential(&self) -> Result<String, CredentialError> {
        Ok(self.cookie.trim().to_string())
    }
}

/// Reads the platform cookies out of the newest Firefox profile.
pub struct FirefoxCookieStore {
    root: Option<PathBuf>,
    domain: String,
}

impl FirefoxCookieStore {
    pub fn new() -> Self {
        Self {
            root: None,
            domain: PLATFORM_COOKIE_DOMAIN.to_string(),
        }
    }

    /// Looks for profiles under `root` instead of the OS default location.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    fn profiles_root(&self) -> Result<PathBuf, CredentialError> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        default_profiles_root()
    }
}

impl Default for FirefoxCookieStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialProvider for FirefoxCookieStore {
    fn describe(&self) -> String {
        format!("Firefox cookie store ({})", self.domain)
    }

    async fn get_credential(&self) -> Result<String, CredentialError> {
        let root = self.profiles_root()?;
        let domain = self.domain.clone();

        tokio::task::spawn_blocking(move || read_firefox_cookies(&root, &domain))
            .await
            .map_err(|e| CredentialError::Join(e.to_string()))?
    }
}

pub fn provider_for(config: &AppConfig) -> Box<dyn CredentialProvider> {
    if config.uses_firefox_cookies() {
        Box::new(FirefoxCookieStore::new())
    } else {
        Box::new(StaticCookie::new(config.cookie.clone()))
    }
}

/// Splits `a=1; b=2` into name/value pairs. Entries without `=` are skipped.
pub fn parse_cookie_pairs(cookie: &str) -> Vec<(String, String)> {
    cookie
        .split(';')
        .filter_map(|part| {
            let (name, value) = part.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(target_os = "macos")]
fn default_profiles_root() -> Result<PathBuf, CredentialError> {
    let home = dirs::home_dir().ok_or(CredentialError::NoHome)?;
    Ok(home.join("Library/Application Support/Firefox/Profiles"))
}

#[cfg(target_os = "windows")]
fn default_profiles_root() -> Result<PathBuf, CredentialError> {
    let data = dirs::data_dir().ok_or(CredentialError::NoHome)?;
    Ok(data.join("Mozilla").join("Firefox").join("Profiles"))
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn default_profiles_root() -> Result<PathBuf, CredentialError> {
    let home = dirs::home_dir().ok_or(CredentialError::NoHome)?;
    let snap = home.join("snap/firefox/common/.mozilla/firefox");
    if snap.is_dir() {
        return Ok(snap);
    }
    Ok(home.join(".mozilla").join("firefox"))
}

/// The profile whose cookie store was written most recently.
fn newest_cookie_store(root: &Path) -> Result<PathBuf, CredentialError> {
    let entries = std::fs::read_dir(root).map_err(|_| CredentialError::NoProfile(root.to_path_buf()))?;

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path().join("cookies.sqlite"))
        .filter(|path| path.is_file())
        .max_by_key(|path| {
            std::fs::metadata(path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH)
        })
        .ok_or_else(|| CredentialError::NoProfile(root.to_path_buf()))
}

fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.trim_start_matches('.');
    host == domain || domain.ends_with(&format!(".{host}"))
}

/// Read-only `file:` URI; `immutable=1` lets us read while Firefox holds its lock on the file.
fn sqlite_uri(path: &Path) -> Result<String, CredentialError> {
    let mut url =
        Url::from_file_path(path).map_err(|_| CredentialError::StorePath(path.to_path_buf()))?;
    url.set_query(Some("immutable=1"));
    Ok(url.into())
}

fn read_firefox_cookies(root: &Path, domain: &str) -> Result<String, CredentialError> {
    let store = newest_cookie_store(root)?;
    debug!(path = %store.display(), "reading Firefox cookie store");

    let conn = Connection::open_with_flags(
        sqlite_uri(&store)?,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
    )?;

    let mut stmt = conn.prepare(
        "SELECT name, value, host FROM moz_cookies ORDER BY LENGTH(host) ASC, id ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut cookies: Vec<(String, String)> = Vec::new();
    for row in rows {
        let (name, value, host) = row?;
        if value.is_empty() || !host_matches(&host, domain) {
            continue;
        }
        // more specific hosts sort later and win
        match cookies.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => cookies.push((name, value)),
        }
    }

    if cookies.is_empty() {
        return Err(CredentialError::NoCookies {
            domain: domain.to_string(),
            path: store,
        });
    }

    info!(count = cookies.len(), "loaded cookies from Firefox");
    Ok(cookies
        .into_iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; "))
}
