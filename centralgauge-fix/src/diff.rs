//! Colorized diff preview for a proposed `(codeBefore, codeAfter)` fix,
//! rendered line-by-line with `similar` and styled with `anstyle`
//! following the same terminal-adaptive palette selection the teacher's
//! diff renderer uses: [`DiffTheme`] (Dark/Light) crossed with
//! [`DiffColorLevel`] (TrueColor/Ansi256/Ansi16), each WCAG-AA compliant.

use anstyle::{Ansi256Color, AnsiColor, Color, Reset, RgbColor, Style};
use similar::{ChangeTag, TextDiff};

/// Terminal background theme for diff rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffTheme {
    Dark,
    Light,
}

impl DiffTheme {
    pub fn detect() -> Self {
        let term = std::env::var("TERM").unwrap_or_default().to_lowercase();
        if term.contains("light") {
            Self::Light
        } else {
            Self::Dark
        }
    }
}

/// Terminal color capability level for palette selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffColorLevel {
    TrueColor,
    Ansi256,
    Ansi16,
}

impl DiffColorLevel {
    pub fn detect() -> Self {
        let colorterm = std::env::var("COLORTERM").unwrap_or_default();
        let term = std::env::var("TERM").unwrap_or_default();
        if colorterm.contains("truecolor") || colorterm.contains("24bit") {
            Self::TrueColor
        } else if term.contains("256") {
            Self::Ansi256
        } else {
            Self::Ansi16
        }
    }
}

const DARK_TC_ADD_LINE_BG: (u8, u8, u8) = (25, 45, 35);
const DARK_TC_DEL_LINE_BG: (u8, u8, u8) = (90, 40, 40);
const LIGHT_TC_ADD_LINE_BG: (u8, u8, u8) = (215, 240, 215);
const LIGHT_TC_DEL_LINE_BG: (u8, u8, u8) = (255, 235, 235);

const DARK_256_ADD_LINE_BG: u8 = 22;
const DARK_256_DEL_LINE_BG: u8 = 52;
const LIGHT_256_ADD_LINE_BG: u8 = 194;
const LIGHT_256_DEL_LINE_BG: u8 = 224;

fn rgb(t: (u8, u8, u8)) -> Color {
    Color::Rgb(RgbColor(t.0, t.1, t.2))
}

fn indexed(i: u8) -> Color {
    Color::Ansi256(Ansi256Color(i))
}

fn add_bg(theme: DiffTheme, level: DiffColorLevel) -> Color {
    match (theme, level) {
        (DiffTheme::Dark, DiffColorLevel::TrueColor) => rgb(DARK_TC_ADD_LINE_BG),
        (DiffTheme::Dark, DiffColorLevel::Ansi256) => indexed(DARK_256_ADD_LINE_BG),
        (DiffTheme::Dark, DiffColorLevel::Ansi16) => Color::Ansi(AnsiColor::Green),
        (DiffTheme::Light, DiffColorLevel::TrueColor) => rgb(LIGHT_TC_ADD_LINE_BG),
        (DiffTheme::Light, DiffColorLevel::Ansi256) => indexed(LIGHT_256_ADD_LINE_BG),
        (DiffTheme::Light, DiffColorLevel::Ansi16) => Color::Ansi(AnsiColor::BrightGreen),
    }
}

fn del_bg(theme: DiffTheme, level: DiffColorLevel) -> Color {
    match (theme, level) {
        (DiffTheme::Dark, DiffColorLevel::TrueColor) => rgb(DARK_TC_DEL_LINE_BG),
        (DiffTheme::Dark, DiffColorLevel::Ansi256) => indexed(DARK_256_DEL_LINE_BG),
        (DiffTheme::Dark, DiffColorLevel::Ansi16) => Color::Ansi(AnsiColor::Red),
        (DiffTheme::Light, DiffColorLevel::TrueColor) => rgb(LIGHT_TC_DEL_LINE_BG),
        (DiffTheme::Light, DiffColorLevel::Ansi256) => indexed(LIGHT_256_DEL_LINE_BG),
        (DiffTheme::Light, DiffColorLevel::Ansi16) => Color::Ansi(AnsiColor::BrightRed),
    }
}

/// One rendered diff line, with its ANSI-styled text ready to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub marker: char,
    pub styled: String,
}

/// Produces a colorized, line-by-line preview of replacing `code_before`
/// with `code_after`, using the terminal's detected theme and color
/// level.
pub fn generate_diff_preview(code_before: &str, code_after: &str) -> Vec<DiffLine> {
    render_diff_preview(code_before, code_after, DiffTheme::detect(), DiffColorLevel::detect())
}

fn render_diff_preview(
    code_before: &str,
    code_after: &str,
    theme: DiffTheme,
    level: DiffColorLevel,
) -> Vec<DiffLine> {
    let diff = TextDiff::from_lines(code_before, code_after);
    let add_style = Style::new().bg_color(Some(add_bg(theme, level)));
    let del_style = Style::new().bg_color(Some(del_bg(theme, level)));
    let reset = Reset.render();

    diff.iter_all_changes()
        .map(|change| {
            let text = change.value().trim_end_matches('\n');
            match change.tag() {
                ChangeTag::Insert => {
                    DiffLine { marker: '+', styled: format!("{}+ {text}{reset}", add_style.render()) }
                }
                ChangeTag::Delete => {
                    DiffLine { marker: '-', styled: format!("{}- {text}{reset}", del_style.render()) }
                }
                ChangeTag::Equal => DiffLine { marker: ' ', styled: format!("  {text}") },
            }
        })
        .collect()
}
