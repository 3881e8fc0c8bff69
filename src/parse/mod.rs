//! Text extraction for loaded documents
//!
//! Files are turned into plain text plus a heading outline so the chunker
//! can prefer section boundaries. Format is chosen from the file extension.

mod html;
mod markdown;
mod text;

pub use html::*;
pub use markdown::*;
pub use text::*;

use crate::error::Result;
use std::path::Path;

/// Formats with dedicated extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Html,
    Markdown,
    PlainText,
}

impl ContentType {
    /// Pick the extractor for a file; unknown extensions are read as text
    pub fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "html" | "htm" => ContentType::Html,
            "md" | "markdown" | "mdx" => ContentType::Markdown,
            _ => ContentType::PlainText,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Html => "html",
            ContentType::Markdown => "markdown",
            ContentType::PlainText => "text",
        }
    }
}

/// Extracted document text
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub title: Option<String>,
    pub text: String,
    pub content_type: ContentType,
    /// Section headings in document order
    pub headings: Vec<Heading>,
}

/// A section heading
#[derive(Debug, Clone)]
pub struct Heading {
    /// 1 for a top-level heading, up to 6
    pub level: u8,
    pub text: String,
    /// Byte offset of the heading in the extracted text
    pub position: usize,
}

impl ParsedDocument {
    pub fn new(text: String, content_type: ContentType) -> Self {
        Self {
            title: None,
            text,
            content_type,
            headings: Vec::new(),
        }
    }

    /// Titles of the enclosing sections at `position`, outermost first
    pub fn heading_trail(&self, position: usize) -> Vec<String> {
        let mut trail: Vec<&Heading> = Vec::new();
        for heading in self.headings.iter().take_while(|h| h.position <= position) {
            while trail.last().is_some_and(|open| open.level >= heading.level) {
                trail.pop();
            }
            trail.push(heading);
        }
        trail.into_iter().map(|h| h.text.clone()).collect()
    }
}

/// Extract text with the parser for `content_type`
pub fn parse_content(content: &str, content_type: ContentType) -> Result<ParsedDocument> {
    match content_type {
        ContentType::Html => parse_html(content),
        ContentType::Markdown => parse_markdown(content),
        ContentType::PlainText => Ok(parse_plain_text(content)),
    }
}

/// Collapse whitespace runs: two or more newlines keep a paragraph break,
/// one newline stays a line break, anything else becomes a single space.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_gap = false;
    let mut newlines = 0usize;

    for c in text.chars() {
        if c.is_whitespace() {
            in_gap = true;
            newlines += usize::from(c == '\n');
            continue;
        }
        if in_gap && !out.is_empty() {
            out.push_str(match newlines {
                0 => " ",
                1 => "\n",
                _ => "\n\n",
            });
        }
        in_gap = false;
        newlines = 0;
        out.push(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(level: u8, text: &str, position: usize) -> Heading {
        Heading {
            level,
            text: text.to_string(),
            position,
        }
    }

    #[test]
    fn test_content_type_for_path() {
        assert_eq!(
            ContentType::for_path(Path::new("rules.html")),
            ContentType::Html
        );
        assert_eq!(
            ContentType::for_path(Path::new("FAQ.MD")),
            ContentType::Markdown
        );
        assert_eq!(
            ContentType::for_path(Path::new("notes.txt")),
            ContentType::PlainText
        );
        assert_eq!(
            ContentType::for_path(Path::new("Makefile")),
            ContentType::PlainText
        );
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("  Hello   world\n\n\n\ntest\n line  "),
            "Hello world\n\ntest\nline"
        );
    }

    #[test]
    fn test_heading_trail_tracks_nesting() {
        let mut doc = ParsedDocument::new("x".repeat(100), ContentType::Markdown);
        doc.headings = vec![
            heading(1, "Clubs", 0),
            heading(2, "Creating", 10),
            heading(2, "Joining", 40),
            heading(1, "Tournaments", 70),
        ];

        assert!(ParsedDocument::new(String::new(), ContentType::PlainText)
            .heading_trail(5)
            .is_empty());
        assert_eq!(doc.heading_trail(5), vec!["Clubs"]);
        assert_eq!(doc.heading_trail(20), vec!["Clubs", "Creating"]);
        assert_eq!(doc.heading_trail(45), vec!["Clubs", "Joining"]);
        assert_eq!(doc.heading_trail(90), vec!["Tournaments"]);
    }
}
