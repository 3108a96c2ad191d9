//! CLI command handlers.

mod auth;
mod generate;
mod themes;

pub use auth::{
    resolve_jar_location, run_auth_clear_command, run_auth_import_command,
    run_auth_status_command,
};
pub use generate::{RunSettings, resolve_run_settings, run_generate_command};
pub use themes::run_themes_command;
