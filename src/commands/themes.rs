//! Themes command handler: list available style presets.

use anyhow::Result;
use v0gen_core::output::{terminal_width, truncate_to_width};
use v0gen_core::themes;

pub fn run_themes_command() -> Result<()> {
    let width = terminal_width();
    let name_width = themes()
        .iter()
        .map(|theme| theme.name.len())
        .max()
        .unwrap_or(8);

    println!("Available themes (pass one with --theme):");
    println!();
    for theme in themes() {
        let line = format!("  {:<name_width$}  {}", theme.name, theme.summary);
        println!("{}", truncate_to_width(&line, width));
    }
    println!();
    println!("Example: v0gen \"a pricing page with three tiers\" --theme dark");

    Ok(())
}
