//! File configuration loading for CLI defaults.
//!
//! The config file is a flat `key = value` TOML subset, one setting per
//! line. Command-line flags always win over file values.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use url::Url;

use crate::prompt::{theme_by_name, themes};

/// Config file name under the `v0gen` config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// File-backed defaults for generation runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Default theme name (same set as `v0gen themes`).
    pub theme: Option<String>,
    /// Default cookie jar path.
    pub cookie_file: Option<PathBuf>,
    /// Launch a visible browser window by default.
    pub headful: Option<bool>,
    /// Generation wait ceiling in seconds.
    pub generation_timeout_secs: Option<u64>,
    /// Probe interval while waiting, in milliseconds.
    pub poll_interval_ms: Option<u64>,
    /// Interactive sign-in wait ceiling in seconds.
    pub auth_timeout_secs: Option<u64>,
    /// Generation site URL, for self-hosted or staging deployments.
    pub target_url: Option<String>,
    /// Directory for failure artifacts (screenshot, page HTML).
    pub dump_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Validates config values against the same ranges the CLI enforces.
    pub fn validate(&self) -> Result<()> {
        if let Some(theme) = &self.theme
            && theme_by_name(theme).is_none()
        {
            let known = themes()
                .iter()
                .map(|theme| theme.name)
                .collect::<Vec<_>>()
                .join(", ");
            bail!("Invalid config value for `theme`: '{theme}'. Known themes: {known}");
        }

        validate_timeout_secs("generation_timeout_secs", self.generation_timeout_secs)?;
        validate_timeout_secs("auth_timeout_secs", self.auth_timeout_secs)?;

        if let Some(interval) = self.poll_interval_ms
            && !(100..=60_000).contains(&interval)
        {
            bail!("Invalid config value for `poll_interval_ms`: {interval}. Expected range: 100..=60000");
        }

        if let Some(target_url) = &self.target_url {
            validate_target_url(target_url)?;
        }

        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Checks that a target URL parses and uses an http(s) scheme.
///
/// Shared between file config validation and the `--target-url` flag.
pub fn validate_target_url(raw: &str) -> Result<()> {
    let parsed =
        Url::parse(raw).with_context(|| format!("Invalid `target_url` value: '{raw}'"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        bail!("Invalid `target_url` value: '{raw}'. Expected an http or https URL");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
    /// Indicates whether configuration was loaded from disk.
    pub loaded_from_file: bool,
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/v0gen/config.toml`
/// 2. `$HOME/.config/v0gen/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    resolve_config_path(
        env_var_non_empty("XDG_CONFIG_HOME"),
        env_var_non_empty("HOME"),
    )
}

/// Resolves the config path from explicit environment values.
///
/// Split out from [`resolve_default_config_path`] so tests can exercise
/// resolution without mutating process-global environment variables.
#[must_use]
pub fn resolve_config_path(
    xdg_config_home: Option<std::ffi::OsString>,
    home: Option<std::ffi::OsString>,
) -> Option<PathBuf> {
    if let Some(xdg_config_home) = xdg_config_home {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("v0gen")
                .join(CONFIG_FILE_NAME),
        );
    }

    let home = home?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("v0gen")
            .join(CONFIG_FILE_NAME),
    )
}

fn env_var_non_empty(name: &str) -> Option<std::ffi::OsString> {
    let value = std::env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig {
            path,
            config: None,
            loaded_from_file: false,
        });
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig {
            path,
            config: None,
            loaded_from_file: false,
        });
    }

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
        loaded_from_file: true,
    })
}

/// Loads and parses a config file at an explicit path.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

/// Parses the flat `key = value` config format.
pub fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();

        match key {
            "theme" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `theme` value on line {}", line_index + 1)
                })?;
                cfg.theme = Some(parsed);
            }
            "cookie_file" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `cookie_file` value on line {}", line_index + 1)
                })?;
                cfg.cookie_file = Some(PathBuf::from(parsed));
            }
            "headful" => {
                let parsed = parse_boolean(value).with_context(|| {
                    format!("Invalid `headful` value on line {}", line_index + 1)
                })?;
                cfg.headful = Some(parsed);
            }
            "generation_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!(
                        "Invalid `generation_timeout_secs` value on line {}",
                        line_index + 1
                    )
                })?;
                cfg.generation_timeout_secs = Some(parsed);
            }
            "poll_interval_ms" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `poll_interval_ms` value on line {}", line_index + 1)
                })?;
                cfg.poll_interval_ms = Some(parsed);
            }
            "auth_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!(
                        "Invalid `auth_timeout_secs` value on line {}",
                        line_index + 1
                    )
                })?;
                cfg.auth_timeout_secs = Some(parsed);
            }
            "target_url" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `target_url` value on line {}", line_index + 1)
                })?;
                cfg.target_url = Some(parsed);
            }
            "dump_dir" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `dump_dir` value on line {}", line_index + 1)
                })?;
                cfg.dump_dir = Some(PathBuf::from(parsed));
            }
            unknown => {
                bail!(
                    "Unknown configuration key: '{}' on line {}",
                    unknown,
                    line_index + 1
                );
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
