//! Generate command: drive a browser session from prompt to extracted code.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, warn};
use v0gen_core::config::FileConfig;
use v0gen_core::output::write_output;
use v0gen_core::poll::{DEFAULT_AUTH_TIMEOUT, DEFAULT_GENERATION_TIMEOUT, DEFAULT_POLL_INTERVAL};
use v0gen_core::progress::ProgressReporter;
use v0gen_core::{
    ConnectTarget, DEFAULT_TARGET_URL, ExtractedCode, FlowError, Jar, PollPolicy, Session,
    SessionOptions, Theme, await_generation, build_prompt, ensure_signed_in,
    extract_generated_code, refresh_jar, submit_prompt, theme_by_name, themes,
};

use crate::cli::Args;
use crate::commands::auth::resolve_jar_location;

/// Effective settings for one generation run, after merging CLI flags,
/// file config, and built-in defaults (in that order).
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub theme: Option<&'static Theme>,
    pub output: Option<PathBuf>,
    pub jar_path: PathBuf,
    pub headful: bool,
    pub connect: Option<ConnectTarget>,
    pub target_url: String,
    pub poll_interval: Duration,
    pub generation_timeout: Duration,
    pub auth_timeout: Duration,
    pub dump_dir: Option<PathBuf>,
}

/// Merges CLI arguments over file config over built-in defaults.
pub fn resolve_run_settings(args: &Args, file_config: Option<&FileConfig>) -> Result<RunSettings> {
    let theme_name = args
        .theme
        .clone()
        .or_else(|| file_config.and_then(|cfg| cfg.theme.clone()));
    let theme = match theme_name.as_deref() {
        Some(name) => Some(theme_by_name(name).ok_or_else(|| {
            let known = themes()
                .iter()
                .map(|theme| theme.name)
                .collect::<Vec<_>>()
                .join(", ");
            anyhow!("Invalid theme '{name}'. Known themes: {known}")
        })?),
        None => None,
    };

    let jar_override = args
        .cookie_file
        .clone()
        .or_else(|| file_config.and_then(|cfg| cfg.cookie_file.clone()));
    let jar_path = resolve_jar_location(jar_override.as_deref())?;

    let connect = args.connect.as_deref().map(ConnectTarget::parse).transpose()?;

    let target_url = args
        .target_url
        .clone()
        .or_else(|| file_config.and_then(|cfg| cfg.target_url.clone()))
        .unwrap_or_else(|| DEFAULT_TARGET_URL.to_string());
    v0gen_core::config::validate_target_url(&target_url)?;

    let poll_interval = args
        .poll_interval
        .or_else(|| file_config.and_then(|cfg| cfg.poll_interval_ms))
        .map_or(DEFAULT_POLL_INTERVAL, Duration::from_millis);
    let generation_timeout = args
        .generation_timeout
        .or_else(|| file_config.and_then(|cfg| cfg.generation_timeout_secs))
        .map_or(DEFAULT_GENERATION_TIMEOUT, Duration::from_secs);
    let auth_timeout = args
        .auth_timeout
        .or_else(|| file_config.and_then(|cfg| cfg.auth_timeout_secs))
        .map_or(DEFAULT_AUTH_TIMEOUT, Duration::from_secs);

    Ok(RunSettings {
        theme,
        output: args.output.clone(),
        jar_path,
        headful: args.headful || file_config.and_then(|cfg| cfg.headful) == Some(true),
        connect,
        target_url,
        poll_interval,
        generation_timeout,
        auth_timeout,
        dump_dir: args
            .dump_dir
            .clone()
            .or_else(|| file_config.and_then(|cfg| cfg.dump_dir.clone())),
    })
}

pub async fn run_generate_command(
    subject: &str,
    settings: &RunSettings,
    use_spinner: bool,
) -> Result<()> {
    let mut jar = Jar::open(&settings.jar_path);
    debug!(cookies = jar.len(), path = %settings.jar_path.display(), "cookie jar opened");

    let options = SessionOptions {
        headful: settings.headful,
        connect: settings.connect.clone(),
        ..SessionOptions::default()
    };
    let mut session = Session::start(&options).await?;

    let progress = ProgressReporter::new(use_spinner);
    let outcome = drive_generation(&mut session, &mut jar, settings, subject, &progress).await;
    progress.finish();

    if outcome.is_err()
        && let Some(dump_dir) = &settings.dump_dir
    {
        capture_failure_artifacts(&session, dump_dir).await;
    }

    session.close().await;

    let extracted = outcome?;
    report_extraction(&extracted, settings.output.as_deref())?;

    Ok(())
}

/// The run itself: open, restore cookies, sign in, submit, wait, extract.
async fn drive_generation(
    session: &mut Session,
    jar: &mut Jar,
    settings: &RunSettings,
    subject: &str,
    progress: &ProgressReporter,
) -> Result<ExtractedCode, FlowError> {
    progress.set_phase("opening v0.dev");
    session.open(&settings.target_url).await?;

    if !jar.is_empty() {
        progress.set_phase("restoring session");
        let applied = session.apply_cookies(&jar.records).await?;
        debug!(applied, "restored session cookies");
        if applied > 0 {
            session.reload().await?;
        }
    }

    // A browser we attached to is one the user can see, so interactive
    // sign-in works there even without --headful.
    let interactive = settings.headful || settings.connect.is_some();

    progress.set_phase("checking sign-in");
    ensure_signed_in(
        session,
        jar,
        interactive,
        PollPolicy::new(settings.poll_interval, settings.auth_timeout),
    )
    .await?;

    progress.set_phase("submitting prompt");
    let prompt = build_prompt(subject, settings.theme);
    debug!(chars = prompt.len(), themed = settings.theme.is_some(), "submitting prompt");
    submit_prompt(session, &prompt).await?;

    progress.set_phase("waiting for generation");
    await_generation(
        session,
        PollPolicy::new(settings.poll_interval, settings.generation_timeout),
    )
    .await?;

    progress.set_phase("extracting code");
    let extracted = extract_generated_code(session).await?;

    // Session cookies rotate during long runs; persist the latest set.
    refresh_jar(session, jar).await?;

    Ok(extracted)
}

fn report_extraction(extracted: &ExtractedCode, output: Option<&Path>) -> Result<()> {
    info!(
        strategy = extracted.strategy,
        language = extracted.language.as_deref().unwrap_or("unknown"),
        chars = extracted.code.len(),
        "code extracted"
    );
    write_output(&extracted.code, output)?;
    if let Some(path) = output {
        info!(path = %path.display(), "wrote generated code");
    }
    Ok(())
}

/// Best-effort debugging artifacts for a failed run. Never fails the run
/// further; every miss is just a warning.
async fn capture_failure_artifacts(session: &Session, dump_dir: &Path) {
    if let Err(error) = tokio::fs::create_dir_all(dump_dir).await {
        warn!(%error, path = %dump_dir.display(), "cannot create dump directory");
        return;
    }

    let screenshot = dump_dir.join("failure.png");
    match session.screenshot(&screenshot).await {
        Ok(()) => info!(path = %screenshot.display(), "saved failure screenshot"),
        Err(error) => warn!(%error, "screenshot capture failed"),
    }

    let html = dump_dir.join("failure.html");
    match session.dump_html(&html).await {
        Ok(()) => info!(path = %html.display(), "saved page HTML"),
        Err(error) => warn!(%error, "page HTML dump failed"),
    }
}
