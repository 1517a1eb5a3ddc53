//! Status lines on stderr
//!
//! Stdout carries only program source or JSON, so every helper here writes
//! to stderr and colors only when stderr is a terminal and `NO_COLOR` is
//! unset.

use crate::ui::Icons;
use owo_colors::{OwoColorize, Style};
use std::sync::OnceLock;

static PALETTE: OnceLock<Palette> = OnceLock::new();

/// One style per kind of status line
#[derive(Debug, Clone)]
pub struct Palette {
    pub heading: Style,
    pub done: Style,
    pub caution: Style,
    pub note: Style,
    pub label: Style,
}

impl Palette {
    /// Colored when stderr is an interactive terminal
    pub fn for_stderr() -> Self {
        let wants_color =
            std::env::var_os("NO_COLOR").is_none() && console::Term::stderr().is_term();
        if wants_color {
            Self::colored()
        } else {
            Self::plain()
        }
    }

    pub fn colored() -> Self {
        Self {
            heading: Style::new().cyan().bold(),
            done: Style::new().green().bold(),
            caution: Style::new().yellow().bold(),
            note: Style::new().blue(),
            label: Style::new().bright_black(),
        }
    }

    pub fn plain() -> Self {
        Self {
            heading: Style::new(),
            done: Style::new(),
            caution: Style::new(),
            note: Style::new(),
            label: Style::new(),
        }
    }
}

pub fn palette() -> &'static Palette {
    PALETTE.get_or_init(Palette::for_stderr)
}

fn paint(text: &str, style: &Style) -> String {
    text.style(style.clone()).to_string()
}

pub fn header(text: &str) {
    eprintln!("{} {}", Icons::ROCKET, paint(text, &palette().heading));
}

pub fn section(title: &str) {
    eprintln!();
    eprintln!("━{}━", paint(title, &palette().heading));
}

pub fn status(icon: &str, label: &str, value: &str) {
    eprintln!("{} {}: {}", icon, paint(label, &palette().label), value);
}

pub fn success(text: &str) {
    eprintln!("{} {}", Icons::CHECK, paint(text, &palette().done));
}

pub fn warn(text: &str) {
    eprintln!("{} {}", Icons::WARN, paint(text, &palette().caution));
}

pub fn info(label: &str, value: &str) {
    eprintln!(
        "{} {}: {}",
        paint(Icons::INFO, &palette().note),
        paint(label, &palette().label),
        value
    );
}

/// Indented `label value` line under a summary
pub fn summary_row(label: &str, value: &str) {
    eprintln!("  {} {}", paint(label, &palette().label), value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_palette_leaves_text_untouched() {
        let plain = Palette::plain();
        assert_eq!(paint("Removed:", &plain.label), "Removed:");
        assert_eq!(paint("done", &plain.done), "done");
    }

    #[test]
    fn test_colored_palette_adds_escapes() {
        let colored = Palette::colored();
        let text = paint("warning", &colored.caution);
        assert!(text.contains("warning"));
        assert!(text.starts_with('\u{1b}'));
    }
}
