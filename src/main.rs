//! CLI entry point for the v0gen tool.

use std::io::{self, IsTerminal, Read};

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};
use v0gen_core::config::{FileConfig, load_default_file_config, load_file_config};
use v0gen_core::failure::{describe_error, exit_code_for, render_failure_lines};
use v0gen_core::output::{print_prompt_guidance, terminal_width};
use v0gen_core::progress::{
    is_dumb_terminal, no_color_env_requested, should_disable_color, should_use_spinner,
};

mod cli;
mod commands;

use cli::{Args, AuthAction, Command};

#[tokio::main]
async fn main() {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let no_color = should_disable_color(no_color_env_requested(), is_dumb_terminal());
    init_tracing(default_level, no_color);

    debug!(?args, "CLI arguments parsed");

    if let Err(error) = run(args).await {
        let descriptor = describe_error(&error);
        error!(error = format!("{error:#}"), "run failed");
        for line in render_failure_lines(&descriptor, terminal_width()) {
            eprintln!("{line}");
        }
        std::process::exit(exit_code_for(descriptor.category));
    }
}

/// Logs go to stderr; stdout is reserved for generated code.
fn init_tracing(default_level: &str, no_color: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_env_filter(filter)
        .try_init();
}

async fn run(args: Args) -> Result<()> {
    match &args.command {
        Some(Command::Themes) => return commands::run_themes_command(),
        Some(Command::Auth { action }) => {
            return match action {
                AuthAction::Import { file } => {
                    commands::run_auth_import_command(file, args.cookie_file.as_deref())
                }
                AuthAction::Status => {
                    commands::run_auth_status_command(args.cookie_file.as_deref())
                }
                AuthAction::Clear => commands::run_auth_clear_command(args.cookie_file.as_deref()),
            };
        }
        None => {}
    }

    // Generation path: prompt from the argument or piped stdin.
    let Some(subject) = resolve_subject(&args)? else {
        print_prompt_guidance();
        std::process::exit(2);
    };

    let file_config = resolve_file_config(&args)?;
    let settings = commands::resolve_run_settings(&args, file_config.as_ref())?;

    let use_spinner = should_use_spinner(io::stderr().is_terminal(), args.quiet, is_dumb_terminal());

    commands::run_generate_command(&subject, &settings, use_spinner).await
}

/// Picks the prompt subject: positional argument first, then piped stdin.
fn resolve_subject(args: &Args) -> Result<Option<String>> {
    if let Some(prompt) = &args.prompt {
        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        return Ok(Some(trimmed.to_string()));
    }

    if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        let trimmed = buffer.trim();
        if !trimmed.is_empty() {
            return Ok(Some(trimmed.to_string()));
        }
    }

    Ok(None)
}

fn resolve_file_config(args: &Args) -> Result<Option<FileConfig>> {
    if args.no_config {
        debug!("config file loading disabled");
        return Ok(None);
    }

    if let Some(path) = &args.config {
        return load_file_config(path).map(Some);
    }

    let loaded = load_default_file_config()?;
    if loaded.loaded_from_file
        && let Some(path) = &loaded.path
    {
        debug!(path = %path.display(), "loaded config file");
    }
    Ok(loaded.config)
}
