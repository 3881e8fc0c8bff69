//! Plain text extraction

use super::{normalize_whitespace, ContentType, ParsedDocument};

/// Parse plain text content
pub fn parse_plain_text(content: &str) -> ParsedDocument {
    let text = normalize_whitespace(content);

    // A short first line doubles as a title
    let title = text.lines().next().and_then(|line| {
        let trimmed = line.trim();
        if trimmed.len() < 100 && !trimmed.is_empty() {
            Some(trimmed.to_string())
        } else {
            None
        }
    });

    ParsedDocument {
        title,
        text,
        content_type: ContentType::PlainText,
        headings: Vec::new(),
    }
}
