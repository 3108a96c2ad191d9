//! Theme presets and prompt assembly.
//!
//! A theme is a named style directive appended to the user's subject line
//! before submission. The presets are deliberately short: v0.dev responds
//! better to one firm style sentence than to a paragraph of adjectives.

/// A named style preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    /// Stable lookup name (lowercase, no spaces).
    pub name: &'static str,
    /// One-line description for `v0gen themes` output.
    pub summary: &'static str,
    /// Style directive appended to the prompt.
    pub directive: &'static str,
}

/// Built-in theme presets.
static THEMES: &[Theme] = &[
    Theme {
        name: "minimal",
        summary: "Clean and quiet, lots of whitespace",
        directive: "Clean minimal design with generous whitespace, a neutral palette, and no decorative elements.",
    },
    Theme {
        name: "dark",
        summary: "Dark mode with high-contrast accents",
        directive: "Dark mode throughout: near-black surfaces, high-contrast accent color, subtle 1px borders.",
    },
    Theme {
        name: "glass",
        summary: "Glassmorphism panels and blur",
        directive: "Glassmorphism styling: translucent panels, backdrop blur, soft diffuse shadows, thin light borders.",
    },
    Theme {
        name: "retro",
        summary: "8-bit arcade look",
        directive: "Retro 8-bit arcade styling: pixelated fonts, bold primary colors, chunky borders and button shadows.",
    },
    Theme {
        name: "corporate",
        summary: "Dense professional SaaS look",
        directive: "Professional SaaS dashboard look: muted blues and grays, dense information layout, restrained typography.",
    },
    Theme {
        name: "playful",
        summary: "Rounded, bright, oversized",
        directive: "Playful styling: rounded shapes, bright saturated colors, oversized buttons, springy hover states.",
    },
];

/// Returns the built-in theme table.
#[must_use]
pub fn themes() -> &'static [Theme] {
    THEMES
}

/// Looks up a theme by name, case-insensitively.
#[must_use]
pub fn theme_by_name(name: &str) -> Option<&'static Theme> {
    let wanted = name.trim().to_ascii_lowercase();
    THEMES.iter().find(|theme| theme.name == wanted)
}

/// Assembles the prompt submitted to the composer.
///
/// Without a theme the subject is submitted verbatim (trimmed). With one,
/// the theme's directive is appended as an explicit style instruction.
#[must_use]
pub fn build_prompt(subject: &str, theme: Option<&Theme>) -> String {
    let subject = subject.trim();
    match theme {
        Some(theme) => format!("{subject}\n\nStyle direction: {}", theme.directive),
        None => subject.to_string(),
    }
}
