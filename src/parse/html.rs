//! HTML text extraction

use super::{normalize_whitespace, ContentType, Heading, ParsedDocument};
use crate::error::Result;
use scraper::{Html, Selector};

/// Parse HTML content and extract text
pub fn parse_html(content: &str) -> Result<ParsedDocument> {
    let document = Html::parse_document(content);
    let mut doc = ParsedDocument::new(String::new(), ContentType::Html);

    if let Ok(selector) = Selector::parse("title") {
        if let Some(title_elem) = document.select(&selector).next() {
            let title = title_elem.text().collect::<String>().trim().to_string();
            if !title.is_empty() {
                doc.title = Some(title);
            }
        }
    }

    let body_selector = Selector::parse("body").ok();
    let root = body_selector
        .as_ref()
        .and_then(|s| document.select(s).next())
        .map(|e| e.html())
        .unwrap_or_else(|| content.to_string());

    let text = html2text::from_read(root.as_bytes(), 80).unwrap_or_else(|_| root.clone());
    doc.text = normalize_whitespace(&text);

    for level in 1..=6u8 {
        if let Ok(selector) = Selector::parse(&format!("h{}", level)) {
            for elem in document.select(&selector) {
                let heading_text = elem.text().collect::<String>().trim().to_string();
                if heading_text.is_empty() {
                    continue;
                }
                // Approximate position based on text content
                let position = doc.text.find(&heading_text).unwrap_or(0);
                doc.headings.push(Heading {
                    level,
                    text: heading_text,
                    position,
                });
            }
        }
    }

    doc.headings.sort_by_key(|h| h.position);

    if doc.title.is_none() {
        doc.title = doc
            .headings
            .iter()
            .find(|h| h.level == 1)
            .map(|h| h.text.clone());
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_html_basic() {
        let html = r#"
        <!DOCTYPE html>
        <html>
        <head><title>Tournament Rules</title><style>p { color: red; }</style></head>
        <body>
            <h1>Registration</h1>
            <p>Clubs register before the deadline.</p>
            <h2>Elo limits</h2>
            <p>Each tournament sets a minimum and maximum Elo.</p>
        </body>
        </html>
        "#;

        let doc = parse_html(html).unwrap();

        assert_eq!(doc.title, Some("Tournament Rules".to_string()));
        assert!(doc.text.contains("Registration"));
        assert!(doc.text.contains("minimum and maximum Elo"));
        assert!(!doc.text.contains("color: red"));
        assert_eq!(doc.headings.len(), 2);
        assert!(doc.headings[0].position <= doc.headings[1].position);
    }

    #[test]
    fn test_title_falls_back_to_h1() {
        let html = "<html><body><h1>Kickoff FAQ</h1><p>Answers.</p></body></html>";
        let doc = parse_html(html).unwrap();
        assert_eq!(doc.title, Some("Kickoff FAQ".to_string()));
    }
}
