//! Markdown text extraction

use super::{ContentType, Heading, ParsedDocument};
use crate::error::Result;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag, TagEnd};

/// Parse Markdown content and extract text
pub fn parse_markdown(content: &str) -> Result<ParsedDocument> {
    let parser = Parser::new(content);
    let mut doc = ParsedDocument::new(String::new(), ContentType::Markdown);

    let mut text = String::with_capacity(content.len());
    let mut current_heading: Option<(u8, String)> = None;
    let mut in_code_block = false;

    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current_heading = Some((heading_level_to_u8(level), String::new()));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, raw)) = current_heading.take() {
                    let heading_text = raw.trim().to_string();
                    if !heading_text.is_empty() {
                        if doc.title.is_none() && level == 1 {
                            doc.title = Some(heading_text.clone());
                        }

                        text.push('\n');
                        doc.headings.push(Heading {
                            level,
                            text: heading_text.clone(),
                            position: text.len(),
                        });
                        text.push_str(&heading_text);
                        text.push('\n');
                    }
                }
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                in_code_block = true;
                text.push_str("\n```");
                if let CodeBlockKind::Fenced(lang) = kind {
                    text.push_str(&lang);
                }
                text.push('\n');
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                text.push_str("```\n");
            }
            Event::Text(t) => match current_heading {
                Some((_, ref mut raw)) => raw.push_str(&t),
                None => text.push_str(&t),
            },
            Event::Code(code) => match current_heading {
                Some((_, ref mut raw)) => raw.push_str(&code),
                None => {
                    text.push('`');
                    text.push_str(&code);
                    text.push('`');
                }
            },
            Event::SoftBreak | Event::HardBreak => {
                if in_code_block {
                    text.push('\n');
                } else {
                    text.push(' ');
                }
            }
            Event::End(TagEnd::Paragraph) => text.push_str("\n\n"),
            Event::End(TagEnd::List(_)) => text.push('\n'),
            Event::Start(Tag::Item) => text.push_str("• "),
            Event::End(TagEnd::Item) => text.push('\n'),
            _ => {}
        }
    }

    // Trim leading whitespace without invalidating heading positions
    let leading = text.len() - text.trim_start().len();
    for heading in &mut doc.headings {
        heading.position = heading.position.saturating_sub(leading);
    }
    doc.text = text.trim().to_string();
    Ok(doc)
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markdown_basic() {
        let markdown = r#"
# Kickoff Guide

Kickoff helps clubs join football tournaments.

## Joining a tournament

Captains apply on behalf of their club.

```text
POST /tournaments/{id}/join
```

- Check the Elo range
- Indicate availability
"#;

        let doc = parse_markdown(markdown).unwrap();

        assert_eq!(doc.title, Some("Kickoff Guide".to_string()));
        assert!(doc.text.contains("football tournaments"));
        assert!(doc.text.contains("POST /tournaments/{id}/join"));
        assert!(doc.text.contains("• Check the Elo range"));
        assert_eq!(doc.headings.len(), 2);
    }

    #[test]
    fn test_heading_positions_point_at_heading_text() {
        let markdown = "# H1\n\nintro\n\n## H2\n\nbody";
        let doc = parse_markdown(markdown).unwrap();

        for heading in &doc.headings {
            assert!(doc.text[heading.position..].starts_with(&heading.text));
        }
    }

    #[test]
    fn test_heading_hierarchy() {
        let markdown = "# H1\n## H2\n### H3\n## Another H2";
        let doc = parse_markdown(markdown).unwrap();

        assert_eq!(doc.headings.len(), 4);
        assert_eq!(doc.headings[0].level, 1);
        assert_eq!(doc.headings[1].level, 2);
        assert_eq!(doc.headings[2].level, 3);
        assert_eq!(doc.headings[3].level, 2);
    }
}
