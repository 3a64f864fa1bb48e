//! Line classification and group-span tracking.
//!
//! A membership belongs to the nearest preceding marker line. [`Span`] is the
//! state machine that tracks which group is open while walking the file, and
//! [`Scanner`] pairs every line with its kind and owning group.

use crate::core::constants::{MARKER, MEMBER_SEPARATOR};

/// Classification of one registry line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// Empty or whitespace-only.
    Blank,
    /// `@@name@@`.
    Marker(&'a str),
    /// `ip:serial`.
    Member { ip: &'a str, serial: &'a str },
    /// Anything else; preserved but never interpreted.
    Other,
}

impl<'a> Line<'a> {
    /// Classify a single line (with or without its trailing newline).
    pub fn parse(raw: &'a str) -> Self {
        let line = raw.trim();

        if line.is_empty() {
            return Line::Blank;
        }

        if let Some(name) = marker_name(line) {
            return Line::Marker(name);
        }

        match line.split_once(MEMBER_SEPARATOR) {
            Some((ip, serial)) if !ip.trim().is_empty() && !serial.trim().is_empty() => {
                Line::Member {
                    ip: ip.trim(),
                    serial: serial.trim(),
                }
            }
            _ => Line::Other,
        }
    }
}

/// Extract the group name from a trimmed marker line.
fn marker_name(line: &str) -> Option<&str> {
    if line.len() <= 2 * MARKER.len() {
        return None;
    }
    line.strip_prefix(MARKER)?.strip_suffix(MARKER)
}

/// Which group span the scan is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Span<'a> {
    /// Before the first marker line.
    #[default]
    Outside,
    /// After the marker of the named group.
    Inside(&'a str),
}

impl<'a> Span<'a> {
    /// Advance over one line. Only marker lines change state.
    pub fn advance(self, line: &Line<'a>) -> Self {
        match line {
            Line::Marker(name) => Span::Inside(*name),
            _ => self,
        }
    }

    /// Name of the open group, if any.
    pub fn group(&self) -> Option<&'a str> {
        match self {
            Span::Outside => None,
            Span::Inside(name) => Some(*name),
        }
    }

    /// True when the scan is inside `group`'s span.
    pub fn is_in(&self, group: &str) -> bool {
        self.group() == Some(group)
    }
}

/// One line of the file with its classification and owner.
#[derive(Debug, Clone, Copy)]
pub struct Scanned<'a> {
    /// Zero-based position of the line.
    pub index: usize,
    /// The line exactly as stored, including its newline if any.
    pub raw: &'a str,
    pub line: Line<'a>,
    /// Group whose span contains the line (a marker owns itself).
    pub owner: Option<&'a str>,
}

/// Iterator over the lines of registry content.
pub struct Scanner<'a> {
    lines: std::iter::Enumerate<std::str::SplitInclusive<'a, char>>,
    span: Span<'a>,
}

impl<'a> Scanner<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            lines: content.split_inclusive('\n').enumerate(),
            span: Span::Outside,
        }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Scanned<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, raw) = self.lines.next()?;
        let line = Line::parse(raw);
        self.span = self.span.advance(&line);

        Some(Scanned {
            index,
            raw,
            line,
            owner: self.span.group(),
        })
    }
}

/// Scan registry content.
pub fn scan(content: &str) -> Scanner<'_> {
    Scanner::new(content)
}
