//! Candidate split positions for the chunker

/// How good a split position is; later variants win
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BreakKind {
    Sentence,
    Paragraph,
    Heading,
}

/// A byte offset where a chunk may end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakPoint {
    pub position: usize,
    pub kind: BreakKind,
}

/// Byte spans of fenced code blocks; splits inside them are avoided
#[derive(Debug, Default)]
pub struct CodeFences {
    spans: Vec<(usize, usize)>,
}

impl CodeFences {
    /// Scan for ``` and ~~~ fences; an unclosed fence runs to the end of the text
    pub fn scan(text: &str) -> Self {
        let mut spans = Vec::new();
        let mut open: Option<usize> = None;
        let mut offset = 0;

        for line in text.split_inclusive('\n') {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                match open.take() {
                    Some(start) => spans.push((start, offset + line.len())),
                    None => open = Some(offset),
                }
            }
            offset += line.len();
        }
        if let Some(start) = open {
            spans.push((start, text.len()));
        }

        Self { spans }
    }

    /// Whether `position` falls strictly inside a fence
    pub fn contains(&self, position: usize) -> bool {
        self.spans
            .iter()
            .any(|&(start, end)| start < position && position < end)
    }

    pub fn spans(&self) -> &[(usize, usize)] {
        &self.spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_kind_ordering() {
        assert!(BreakKind::Heading > BreakKind::Paragraph);
        assert!(BreakKind::Paragraph > BreakKind::Sentence);
    }

    #[test]
    fn test_scan_finds_closed_fence() {
        let text = "Some text\n```\ncode here\n```\nMore text";
        let fences = CodeFences::scan(text);

        assert_eq!(fences.spans(), &[(10, 28)]);
        assert!(fences.contains(15));
        assert!(!fences.contains(10));
        assert!(!fences.contains(30));
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let text = "Intro\n~~~\nlet x = 1;\nstill code";
        let fences = CodeFences::scan(text);
        assert_eq!(fences.spans(), &[(6, text.len())]);
    }
}
