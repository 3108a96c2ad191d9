//! Auth command handlers: import, inspect, and clear the cookie jar.

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow, bail};
use tracing::{info, warn};
use v0gen_core::{
    CapturedCookieFormat, Jar, default_jar_path, expiry_label, parse_captured_cookies,
    unique_domain_count,
};

/// Resolves the jar path: explicit flag first, then the default location.
pub fn resolve_jar_location(cookie_file: Option<&Path>) -> Result<PathBuf> {
    match cookie_file {
        Some(path) => Ok(path.to_path_buf()),
        None => default_jar_path()
            .map_err(|error| anyhow!("Cannot resolve cookie jar path: {error}")),
    }
}

pub fn run_auth_import_command(file: &Path, cookie_file: Option<&Path>) -> Result<()> {
    let raw_input = read_import_input(file)?;
    let parsed = parse_captured_cookies(&raw_input)
        .map_err(|error| anyhow!("Cookie import failed: {error}"))?;

    for warning in &parsed.warnings {
        warn!("{warning}");
    }

    let format_label = match parsed.format {
        CapturedCookieFormat::Netscape => "netscape",
        CapturedCookieFormat::Json => "json",
    };
    let count = parsed.cookies.len();
    let domains = unique_domain_count(&parsed.cookies);

    let jar_path = resolve_jar_location(cookie_file)?;
    let mut jar = Jar::open(&jar_path);
    jar.overwrite(parsed.cookies)
        .map_err(|error| anyhow!("Failed to save cookie jar: {error}"))?;

    info!(
        format = format_label,
        cookies = count,
        domains,
        path = %jar_path.display(),
        "Cookie import complete"
    );
    println!(
        "Imported {count} cookies ({domains} domains) into {}",
        jar_path.display()
    );

    Ok(())
}

pub fn run_auth_status_command(cookie_file: Option<&Path>) -> Result<()> {
    let jar_path = resolve_jar_location(cookie_file)?;
    let jar = Jar::open(&jar_path);

    println!("jar_path = {}", jar_path.display());
    if jar.is_empty() {
        println!("cookies = 0");
        println!("Import some with `v0gen auth import <file>` or sign in once with --headful.");
        return Ok(());
    }

    println!("cookies = {}", jar.len());
    println!("domains = {}", unique_domain_count(&jar.records));

    let mut rows: Vec<_> = jar
        .records
        .iter()
        .map(|record| (record.domain.clone(), record.name.clone(), record.expires))
        .collect();
    rows.sort();
    for (domain, name, expires) in rows {
        // Cookie values are deliberately never printed.
        println!("  {domain}  {name}  (expires: {})", expiry_label(expires));
    }

    Ok(())
}

pub fn run_auth_clear_command(cookie_file: Option<&Path>) -> Result<()> {
    let jar_path = resolve_jar_location(cookie_file)?;
    let jar = Jar::open(&jar_path);
    let removed = jar
        .clear()
        .map_err(|error| anyhow!("Failed to clear cookie jar: {error}"))?;

    if removed {
        info!(path = %jar_path.display(), "Cleared stored session cookies");
        println!("Cleared {}", jar_path.display());
    } else {
        println!("No stored session cookies found");
    }

    Ok(())
}

fn read_import_input(file: &Path) -> Result<String> {
    if file == Path::new("-") {
        if io::stdin().is_terminal() {
            bail!(
                "Refusing to read cookies from an interactive terminal; \
                 pipe the export in or pass a file path"
            );
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        if buffer.trim().is_empty() {
            bail!("No cookie data provided on stdin");
        }
        return Ok(buffer);
    }

    fs::read_to_string(file)
        .map_err(|error| anyhow!("Cannot read cookie file '{}': {}", file.display(), error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_jar_location_prefers_explicit_path() {
        let path = resolve_jar_location(Some(Path::new("/tmp/custom-jar.json"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom-jar.json"));
    }

    #[test]
    fn test_read_import_input_missing_file_is_an_error() {
        let err = read_import_input(Path::new("/nonexistent/cookies.txt")).unwrap_err();
        assert!(err.to_string().contains("Cannot read cookie file"));
    }
}
