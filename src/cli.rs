//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Generate UI code from a prompt on v0.dev.
///
/// v0gen drives a real Chromium session: it reuses your saved GitHub
/// sign-in (or walks you through one with --headful), submits the prompt,
/// waits for generation to finish, and prints the generated code to
/// stdout.
#[derive(Parser, Debug)]
#[command(name = "v0gen")]
#[command(author, version, about)]
pub struct Args {
    /// What to build, e.g. "a pricing page with three tiers"
    #[arg(value_name = "PROMPT")]
    pub prompt: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,

    /// Apply a named style preset (list them with `v0gen themes`)
    #[arg(short = 't', long, value_name = "NAME")]
    pub theme: Option<String>,

    /// Write generated code to a file instead of stdout
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Cookie jar path (default: ~/.config/v0gen/cookies.json)
    #[arg(long, value_name = "FILE")]
    pub cookie_file: Option<PathBuf>,

    /// Launch a visible browser window (needed for interactive sign-in)
    #[arg(long)]
    pub headful: bool,

    /// Attach to a running browser: a DevTools port or ws:// URL
    #[arg(long, value_name = "PORT|URL")]
    pub connect: Option<String>,

    /// Maximum seconds to wait for generation to finish (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub generation_timeout: Option<u64>,

    /// Poll interval while waiting, in milliseconds (100-60000)
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(100..=60_000))]
    pub poll_interval: Option<u64>,

    /// Maximum seconds to wait for interactive sign-in (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub auth_timeout: Option<u64>,

    /// Generation site URL, for self-hosted or staging deployments
    #[arg(long, value_name = "URL")]
    pub target_url: Option<String>,

    /// Write failure artifacts (screenshot, page HTML) to this directory
    #[arg(long, value_name = "DIR")]
    pub dump_dir: Option<PathBuf>,

    /// Load defaults from an explicit config file
    #[arg(long, value_name = "FILE", conflicts_with = "no_config")]
    pub config: Option<PathBuf>,

    /// Skip loading the config file
    #[arg(long)]
    pub no_config: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available style presets
    Themes,

    /// Manage stored v0.dev session cookies
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Import cookies exported from a signed-in browser
    Import {
        /// Cookie export file (Netscape cookies.txt or JSON), or '-' for stdin
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Show what the cookie jar currently holds
    Status,

    /// Delete the stored cookie jar
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_no_args_parses_successfully() {
        let args = Args::try_parse_from(["v0gen"]).unwrap();
        assert!(args.prompt.is_none());
        assert!(args.command.is_none());
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(!args.headful);
    }

    #[test]
    fn test_cli_positional_prompt() {
        let args = Args::try_parse_from(["v0gen", "a pricing page with three tiers"]).unwrap();
        assert_eq!(
            args.prompt.as_deref(),
            Some("a pricing page with three tiers")
        );
        assert!(args.command.is_none());
    }

    #[test]
    fn test_cli_prompt_with_theme_and_output() {
        let args = Args::try_parse_from([
            "v0gen",
            "a login form",
            "--theme",
            "dark",
            "-o",
            "login.tsx",
        ])
        .unwrap();
        assert_eq!(args.prompt.as_deref(), Some("a login form"));
        assert_eq!(args.theme.as_deref(), Some("dark"));
        assert_eq!(args.output, Some(PathBuf::from("login.tsx")));
    }

    #[test]
    fn test_cli_themes_subcommand() {
        let args = Args::try_parse_from(["v0gen", "themes"]).unwrap();
        assert!(matches!(args.command, Some(Command::Themes)));
        assert!(args.prompt.is_none());
    }

    #[test]
    fn test_cli_auth_import_subcommand() {
        let args = Args::try_parse_from(["v0gen", "auth", "import", "cookies.txt"]).unwrap();
        match args.command {
            Some(Command::Auth {
                action: AuthAction::Import { file },
            }) => assert_eq!(file, PathBuf::from("cookies.txt")),
            other => panic!("expected auth import, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_auth_import_stdin_marker() {
        let args = Args::try_parse_from(["v0gen", "auth", "import", "-"]).unwrap();
        match args.command {
            Some(Command::Auth {
                action: AuthAction::Import { file },
            }) => assert_eq!(file, PathBuf::from("-")),
            other => panic!("expected auth import, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_auth_status_and_clear() {
        let args = Args::try_parse_from(["v0gen", "auth", "status"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Command::Auth {
                action: AuthAction::Status
            })
        ));

        let args = Args::try_parse_from(["v0gen", "auth", "clear"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Command::Auth {
                action: AuthAction::Clear
            })
        ));
    }

    #[test]
    fn test_cli_auth_without_action_is_rejected() {
        let result = Args::try_parse_from(["v0gen", "auth"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["v0gen", "-v", "x"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["v0gen", "-vv", "x"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["v0gen", "-q", "x"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_headful_and_connect() {
        let args = Args::try_parse_from(["v0gen", "x", "--headful"]).unwrap();
        assert!(args.headful);

        let args = Args::try_parse_from(["v0gen", "x", "--connect", "9222"]).unwrap();
        assert_eq!(args.connect.as_deref(), Some("9222"));

        let args =
            Args::try_parse_from(["v0gen", "x", "--connect", "ws://127.0.0.1:9222/devtools"])
                .unwrap();
        assert_eq!(
            args.connect.as_deref(),
            Some("ws://127.0.0.1:9222/devtools")
        );
    }

    #[test]
    fn test_cli_generation_timeout_range() {
        let args = Args::try_parse_from(["v0gen", "x", "--generation-timeout", "600"]).unwrap();
        assert_eq!(args.generation_timeout, Some(600));

        let result = Args::try_parse_from(["v0gen", "x", "--generation-timeout", "0"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );

        let result = Args::try_parse_from(["v0gen", "x", "--generation-timeout", "3601"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_poll_interval_range() {
        let args = Args::try_parse_from(["v0gen", "x", "--poll-interval", "500"]).unwrap();
        assert_eq!(args.poll_interval, Some(500));

        let result = Args::try_parse_from(["v0gen", "x", "--poll-interval", "50"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_auth_timeout_range() {
        let args = Args::try_parse_from(["v0gen", "x", "--auth-timeout", "300"]).unwrap();
        assert_eq!(args.auth_timeout, Some(300));

        let result = Args::try_parse_from(["v0gen", "x", "--auth-timeout", "0"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_config_conflicts_with_no_config() {
        let result =
            Args::try_parse_from(["v0gen", "x", "--config", "cfg.toml", "--no-config"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn test_cli_dump_dir_and_target_url() {
        let args = Args::try_parse_from([
            "v0gen",
            "x",
            "--dump-dir",
            "/tmp/dumps",
            "--target-url",
            "https://v0.example.test/",
        ])
        .unwrap();
        assert_eq!(args.dump_dir, Some(PathBuf::from("/tmp/dumps")));
        assert_eq!(args.target_url.as_deref(), Some("https://v0.example.test/"));
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        // --help causes early exit, so we check it returns an error with Help kind
        let result = Args::try_parse_from(["v0gen", "--help"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayHelp
        );
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let result = Args::try_parse_from(["v0gen", "--version"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayVersion
        );
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let result = Args::try_parse_from(["v0gen", "--invalid-flag"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::UnknownArgument
        );
    }
}
