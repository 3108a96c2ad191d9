//! Cookie jar persistence.
//!
//! The jar is the only state this tool keeps between runs: a plain JSON
//! array of cookie records written to a flat file. Saving overwrites the
//! whole file; loading is best-effort (a missing or mangled jar means an
//! empty jar, never a fatal error). There is no versioning and no
//! integrity layer on top of the serialized array.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// File name of the jar under the config directory.
pub const JAR_FILE_NAME: &str = "cookies.json";

/// A single persisted browser cookie.
///
/// The value field is intentionally redacted in Debug output to prevent
/// accidental logging of sensitive session tokens.
#[derive(Clone, Serialize, Deserialize)]
pub struct CookieRecord {
    /// Cookie name.
    pub name: String,
    /// Cookie value (sensitive — never log).
    value: String,
    /// The domain the cookie belongs to (leading dot = subdomains match).
    pub domain: String,
    /// The URL path scope for the cookie.
    #[serde(default = "default_path")]
    pub path: String,
    /// Unix timestamp for expiry (0 = session cookie).
    #[serde(default)]
    pub expires: u64,
    /// Whether the cookie should only be sent over HTTPS.
    #[serde(default)]
    pub secure: bool,
    /// Whether the cookie is hidden from page JavaScript.
    #[serde(default)]
    pub http_only: bool,
    /// SameSite attribute label, when the browser reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn default_path() -> String {
    "/".to_string()
}

impl CookieRecord {
    /// Creates a new cookie record.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        value: String,
        domain: String,
        path: String,
        expires: u64,
        secure: bool,
        http_only: bool,
        same_site: Option<String>,
    ) -> Self {
        Self {
            name,
            value,
            domain,
            path,
            expires,
            secure,
            http_only,
            same_site,
        }
    }

    /// Returns the cookie value.
    ///
    /// Cookie values are sensitive — avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the cookie is expired at `now` (unix seconds).
    ///
    /// Session cookies (`expires == 0`) never count as expired here; the
    /// browser decides their lifetime.
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires > 0 && self.expires <= now
    }
}

/// Clamps a floating-point expiry (seconds since the unix epoch, as CDP and
/// JSON exports report it) into the record's `u64` representation.
///
/// Non-finite, zero, and negative inputs all mean "session cookie".
pub(crate) fn normalized_expiry(raw_expiry: f64) -> u64 {
    if !raw_expiry.is_finite() || raw_expiry <= 0.0 {
        return 0;
    }

    let floored = raw_expiry.floor();
    let integer_text = format!("{floored:.0}");
    // Only reachable with expiry values exceeding u64::MAX; a cookie that
    // outlives the sun can stay permanent.
    integer_text.parse::<u64>().unwrap_or(u64::MAX)
}

// Custom Debug impl that redacts the cookie value.
impl fmt::Debug for CookieRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieRecord")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("expires", &self.expires)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("same_site", &self.same_site)
            .finish()
    }
}

/// Errors that can occur while reading or writing the jar file.
#[derive(Debug, thiserror::Error)]
pub enum JarError {
    /// I/O error touching the jar file.
    #[error("failed to access cookie jar: {0}")]
    Io(#[from] io::Error),

    /// The jar file exists but is not a valid serialized cookie array.
    #[error("cookie jar is not a valid cookie array: {0}")]
    Malformed(#[from] serde_json::Error),

    /// No home directory available to place the default jar.
    #[error("cannot resolve a config directory (set HOME or XDG_CONFIG_HOME)")]
    NoConfigDir,
}

/// The persisted cookie set, tied to the file it lives in.
#[derive(Debug, Clone)]
pub struct Jar {
    /// Where the jar is (or will be) stored.
    pub path: PathBuf,
    /// Current in-memory records.
    pub records: Vec<CookieRecord>,
}

impl Jar {
    /// Opens the jar at `path`, best-effort.
    ///
    /// A missing file yields an empty jar silently; an unreadable or
    /// malformed file yields an empty jar with a warning. Every run starts
    /// from whatever this returns.
    #[must_use]
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let records = match read_jar_file(path) {
            Ok(records) => {
                debug!(cookies = records.len(), "loaded cookie jar");
                records
            }
            Err(JarError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no cookie jar on disk; starting empty");
                Vec::new()
            }
            Err(err) => {
                warn!(error = %err, "ignoring unusable cookie jar; starting empty");
                Vec::new()
            }
        };

        Self {
            path: path.to_path_buf(),
            records,
        }
    }

    /// Replaces the in-memory records and overwrites the jar file.
    ///
    /// # Errors
    ///
    /// Returns [`JarError::Io`] when the file or its parent directory cannot
    /// be written.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display(), cookies = records.len()))]
    pub fn overwrite(&mut self, records: Vec<CookieRecord>) -> Result<(), JarError> {
        self.records = records;
        self.save()
    }

    /// Writes the current records to the jar file, replacing it entirely.
    ///
    /// # Errors
    ///
    /// Returns [`JarError::Io`] when the file or its parent directory cannot
    /// be written.
    pub fn save(&self) -> Result<(), JarError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let serialized = serde_json::to_string_pretty(&self.records)?;
        fs::write(&self.path, serialized)?;
        debug!(cookies = self.records.len(), path = %self.path.display(), "saved cookie jar");
        Ok(())
    }

    /// Deletes the jar file.
    ///
    /// Returns `true` when a file was removed, `false` when none existed.
    ///
    /// # Errors
    ///
    /// Returns [`JarError::Io`] for failures other than the file being absent.
    pub fn clear(&self) -> Result<bool, JarError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(JarError::Io(err)),
        }
    }

    /// Number of records currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the jar holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Reads and deserializes the jar file strictly.
///
/// # Errors
///
/// Returns [`JarError::Io`] when the file cannot be read and
/// [`JarError::Malformed`] when it does not hold a cookie array.
pub fn read_jar_file(path: &Path) -> Result<Vec<CookieRecord>, JarError> {
    let raw = fs::read_to_string(path)?;
    let records: Vec<CookieRecord> = serde_json::from_str(&raw)?;
    Ok(records)
}

/// Resolves the default jar path from the process environment.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/v0gen/cookies.json`
/// 2. `$HOME/.config/v0gen/cookies.json`
///
/// # Errors
///
/// Returns [`JarError::NoConfigDir`] when neither variable is set.
pub fn default_jar_path() -> Result<PathBuf, JarError> {
    resolve_jar_path(
        env_var_non_empty("XDG_CONFIG_HOME"),
        env_var_non_empty("HOME"),
    )
}

/// Resolves the jar path from explicit environment values.
///
/// Split out from [`default_jar_path`] so tests can exercise resolution
/// without mutating process-global environment variables.
///
/// # Errors
///
/// Returns [`JarError::NoConfigDir`] when neither value is present.
pub fn resolve_jar_path(
    xdg_config_home: Option<std::ffi::OsString>,
    home: Option<std::ffi::OsString>,
) -> Result<PathBuf, JarError> {
    if let Some(xdg_config_home) = xdg_config_home {
        return Ok(PathBuf::from(xdg_config_home)
            .join("v0gen")
            .join(JAR_FILE_NAME));
    }

    let home = home.ok_or(JarError::NoConfigDir)?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("v0gen")
        .join(JAR_FILE_NAME))
}

fn env_var_non_empty(name: &str) -> Option<std::ffi::OsString> {
    let value = std::env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Renders a cookie expiry for display: `session` for 0, an HTTP-date
/// otherwise.
#[must_use]
pub fn expiry_label(expires: u64) -> String {
    if expires == 0 {
        return "session".to_string();
    }
    UNIX_EPOCH
        .checked_add(Duration::from_secs(expires))
        .map_or_else(|| "far future".to_string(), |time| httpdate::fmt_http_date(time))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_record(name: &str, value: &str) -> CookieRecord {
        CookieRecord::new(
            name.to_string(),
            value.to_string(),
            ".v0.dev".to_string(),
            "/".to_string(),
            4_102_444_800,
            true,
            true,
            Some("lax".to_string()),
        )
    }

    #[test]
    fn test_jar_open_missing_file_yields_empty_jar() {
        let dir = TempDir::new().unwrap();
        let jar = Jar::open(dir.path().join("cookies.json"));
        assert!(jar.is_empty());
        assert_eq!(jar.len(), 0);
    }

    #[test]
    fn test_jar_save_then_open_round_trips_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");

        let mut jar = Jar::open(&path);
        jar.overwrite(vec![sample_record("session", "abc123"), sample_record("theme", "dark")])
            .unwrap();

        let reloaded = Jar::open(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.records[0].name, "session");
        assert_eq!(reloaded.records[0].value(), "abc123");
        assert_eq!(reloaded.records[0].domain, ".v0.dev");
        assert!(reloaded.records[0].secure);
        assert!(reloaded.records[0].http_only);
        assert_eq!(reloaded.records[0].same_site.as_deref(), Some("lax"));
    }

    #[test]
    fn test_jar_save_overwrites_previous_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");

        let mut jar = Jar::open(&path);
        jar.overwrite(vec![sample_record("a", "1"), sample_record("b", "2")])
            .unwrap();
        jar.overwrite(vec![sample_record("only", "3")]).unwrap();

        let reloaded = Jar::open(&path);
        assert_eq!(reloaded.len(), 1, "save must replace the whole file");
        assert_eq!(reloaded.records[0].name, "only");
    }

    #[test]
    fn test_jar_open_malformed_file_yields_empty_jar() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");
        fs::write(&path, "{ not a cookie array").unwrap();

        let jar = Jar::open(&path);
        assert!(jar.is_empty(), "malformed jar must degrade to empty, not fail");
    }

    #[test]
    fn test_read_jar_file_malformed_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");
        fs::write(&path, "[{\"name\": 42}]").unwrap();

        let err = read_jar_file(&path).unwrap_err();
        assert!(matches!(err, JarError::Malformed(_)));
    }

    #[test]
    fn test_jar_save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("cookies.json");

        let mut jar = Jar::open(&path);
        jar.overwrite(vec![sample_record("s", "v")]).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_jar_clear_removes_file_and_reports() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");

        let mut jar = Jar::open(&path);
        jar.overwrite(vec![sample_record("s", "v")]).unwrap();

        assert!(jar.clear().unwrap(), "first clear should remove the file");
        assert!(!path.exists());
        assert!(!jar.clear().unwrap(), "second clear finds nothing to remove");
    }

    #[test]
    fn test_cookie_record_debug_redacts_value() {
        let record = sample_record("session", "super_secret_token");
        let debug_str = format!("{record:?}");
        assert!(
            debug_str.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_str.contains("super_secret_token"),
            "Debug output must NOT contain the actual value"
        );
    }

    #[test]
    fn test_jar_file_contains_plain_serialized_values() {
        // The jar is intentionally plain JSON so other tools can read it.
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");

        let mut jar = Jar::open(&path);
        jar.overwrite(vec![sample_record("session", "abc123")]).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.trim_start().starts_with('['), "jar file is a JSON array");
        assert!(raw.contains("\"abc123\""), "values are stored as-is");
    }

    #[test]
    fn test_jar_load_tolerates_missing_optional_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");
        fs::write(
            &path,
            r#"[{"name":"sid","value":"v","domain":"v0.dev"}]"#,
        )
        .unwrap();

        let records = read_jar_file(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, "/");
        assert_eq!(records[0].expires, 0);
        assert!(!records[0].secure);
        assert!(!records[0].http_only);
        assert!(records[0].same_site.is_none());
    }

    #[test]
    fn test_cookie_record_is_expired() {
        let mut record = sample_record("s", "v");
        record.expires = 1000;
        assert!(record.is_expired(1000));
        assert!(record.is_expired(2000));
        assert!(!record.is_expired(999));

        record.expires = 0;
        assert!(!record.is_expired(u64::MAX), "session cookies never expire here");
    }

    #[test]
    fn test_expiry_label_formats() {
        assert_eq!(expiry_label(0), "session");
        let label = expiry_label(4_102_444_800);
        assert!(label.contains("2100"), "far-future expiry renders as a date: {label}");
    }

    #[test]
    fn test_normalized_expiry_clamps_odd_inputs() {
        assert_eq!(normalized_expiry(4_102_444_800.7), 4_102_444_800);
        assert_eq!(normalized_expiry(0.0), 0);
        assert_eq!(normalized_expiry(-1.0), 0);
        assert_eq!(normalized_expiry(f64::NAN), 0);
        assert_eq!(normalized_expiry(f64::INFINITY), 0);
    }

    #[test]
    fn test_resolve_jar_path_prefers_xdg_config_home() {
        let path = resolve_jar_path(
            Some("/tmp/xdg-test".into()),
            Some("/tmp/home-test".into()),
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/tmp/xdg-test/v0gen/cookies.json"));
    }

    #[test]
    fn test_resolve_jar_path_falls_back_to_home_config() {
        let path = resolve_jar_path(None, Some("/tmp/home-test".into())).unwrap();
        assert_eq!(
            path,
            PathBuf::from("/tmp/home-test/.config/v0gen/cookies.json")
        );
    }

    #[test]
    fn test_resolve_jar_path_without_any_base_fails() {
        let err = resolve_jar_path(None, None).unwrap_err();
        assert!(matches!(err, JarError::NoConfigDir));
    }
}
