//! Console output helpers.
//!
//! Color scheme (respects NO_COLOR):
//! - Green: success
//! - Red: errors
//! - Yellow: partial successes and warnings
//! - Cyan: paths, hints
//! - Bold: headers, values
//! - Dim: secondary info

use console::{style, StyledObject};
use std::fmt::Display;

use crate::core::outcome::{Outcome, Status};

const RULE_WIDTH: usize = 56;

fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

/// Apply `styler` unless colors are disabled.
fn paint<D: Display>(value: D, styler: fn(StyledObject<D>) -> StyledObject<D>) -> String {
    if colors_enabled() {
        styler(style(value)).to_string()
    } else {
        value.to_string()
    }
}

/// Leading glyph of a status line.
#[derive(Clone, Copy)]
enum Mark {
    Ok,
    Warn,
    Fail,
    Hint,
}

impl Mark {
    fn glyph(self) -> String {
        match self {
            Mark::Ok => paint("✓", StyledObject::green),
            Mark::Warn => paint("⚠", StyledObject::yellow),
            Mark::Fail => paint("✗", StyledObject::red),
            Mark::Hint => paint("→", StyledObject::cyan),
        }
    }
}

/// Example: `✓ group 'lab' deleted`
pub fn success(msg: &str) {
    println!("{} {}", Mark::Ok.glyph(), msg);
}

/// Example: `⚠ failed to create backup`
pub fn warn(msg: &str) {
    println!("{} {}", Mark::Warn.glyph(), msg);
}

/// Print an error to stderr.
pub fn error(msg: &str) {
    eprintln!("{} {}", Mark::Fail.glyph(), msg);
}

/// Print a follow-up suggestion to stderr.
///
/// Example: `→ install openssh-client`
pub fn hint(msg: &str) {
    eprintln!("{} {}", Mark::Hint.glyph(), paint(msg, StyledObject::cyan));
}

/// Print an operation outcome with the mark matching its status.
pub fn outcome(outcome: &Outcome) {
    match outcome.status {
        Status::Success => success(&outcome.message),
        Status::PartialSuccess => warn(&outcome.message),
        Status::Failure => error(&outcome.message),
    }
}

pub fn header(title: &str) {
    println!("{}", paint(title, StyledObject::bold));
}

/// Example: `  10.0.0.1  SN1234`
pub fn kv(label: &str, value: impl Display) {
    println!(
        "  {}  {}",
        paint(label, StyledObject::dim),
        paint(value, StyledObject::bold)
    );
}

pub fn list_item(item: &str) {
    println!("  • {}", item);
}

pub fn rule() {
    println!("{}", paint("─".repeat(RULE_WIDTH), StyledObject::dim));
}

/// Inline path, cyan.
pub fn path(p: impl Display) -> String {
    paint(p, StyledObject::cyan)
}

/// Inline command, green.
pub fn cmd(c: &str) -> String {
    paint(c, StyledObject::green)
}

/// Inline count, bold.
pub fn count(n: usize) -> String {
    paint(n, StyledObject::bold)
}

/// Example: `no groups registered`
pub fn dimmed(msg: &str) {
    println!("{}", paint(msg, StyledObject::dim));
}

/// Print machine-readable output verbatim.
pub fn data(text: &str) {
    println!("{}", text);
}

pub fn blank() {
    println!();
}

/// Blank line, bold title, rule.
pub fn section(title: &str) {
    blank();
    header(title);
    rule();
}
