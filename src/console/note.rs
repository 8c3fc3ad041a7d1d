//! Console annotations and their rendering.
//!
//! Annotations travel beside the raw log as JSON lines, one record per
//! matched pattern, and point at the annotated line by byte range.

use serde::{Deserialize, Serialize};

use crate::process::OutputCharset;

use super::splitter::LineSplitter;

/// Rendering hint attached to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteTag {
    #[serde(rename = "error-inline")]
    ErrorInline,
    #[serde(rename = "warning-inline")]
    WarningInline,
}

impl NoteTag {
    /// CSS class used when rendering the line.
    #[must_use]
    pub fn css_class(self) -> &'static str {
        match self {
            Self::ErrorInline => "error-inline",
            Self::WarningInline => "warning-inline",
        }
    }

    /// Wrap already escaped text in the tag's markup.
    #[must_use]
    pub fn markup(self, text: &str) -> String {
        format!("<span class={}>{text}</span>", self.css_class())
    }
}

/// An annotation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub tag: NoteTag,
    /// Zero-based line number in the raw log.
    pub line: u64,
    /// Offset of the first byte of the line in the raw log.
    pub start: u64,
    /// Offset one past the last byte of the line, terminator included.
    pub end: u64,
}

impl Annotation {
    /// Encode as one JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_line(&self) -> serde_json::Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Parse every record of an annotation log, skipping blank lines.
    ///
    /// # Errors
    ///
    /// Returns an error on the first malformed record.
    pub fn parse_all(notes: &str) -> serde_json::Result<Vec<Self>> {
        notes
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect()
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a raw log as HTML, marking up annotated lines.
///
/// When a line carries several tags the first recorded one wins.
#[must_use]
pub fn render_html(raw: &[u8], notes: &[Annotation], charset: &OutputCharset) -> String {
    let mut splitter = LineSplitter::new();
    let mut lines = splitter.push(raw);
    lines.extend(splitter.finish());

    let mut html = String::from("<pre>\n");
    for (number, line) in (0u64..).zip(lines) {
        let decoded = charset.decode(&line);
        let text = escape_html(super::patterns::trim_eol(&decoded));
        match notes.iter().find(|note| note.line == number) {
            Some(note) => html.push_str(&note.tag.markup(&text)),
            None => html.push_str(&text),
        }
        html.push('\n');
    }
    html.push_str("</pre>\n");
    html
}
