//! Prompt templates for the condense-question chat mode

use crate::llm::{ChatMessage, Role};
use crate::store::ScoredNode;

pub const CONDENSE_QUESTION_TEMPLATE: &str = "\
Given a conversation (between Human and Assistant) and a follow up message from Human, \
rewrite the message to be a standalone question that captures all relevant context \
from the conversation.

<Chat History>
{chat_history}

<Follow Up Message>
{question}

<Standalone question>
";

pub const TEXT_QA_TEMPLATE: &str = "\
Context information is below.
---------------------
{context_str}
---------------------
Given the context information and not prior knowledge, answer the query.
Query: {query_str}
Answer: ";

/// Render history as `role: content` lines
pub fn format_history(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| match m.role {
            Role::User => format!("Human: {}", m.content),
            Role::Assistant => format!("Assistant: {}", m.content),
            Role::System => format!("System: {}", m.content),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn condense_prompt(history: &[ChatMessage], question: &str) -> String {
    CONDENSE_QUESTION_TEMPLATE
        .replace("{chat_history}", &format_history(history))
        .replace("{question}", question)
}

/// Context block: a `file_path:` header then the node text, per node
pub fn format_context(nodes: &[ScoredNode]) -> String {
    nodes
        .iter()
        .map(|n| format!("file_path: {}\n\n{}", n.node.doc_path, n.node.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn qa_prompt(nodes: &[ScoredNode], query: &str) -> String {
    TEXT_QA_TEMPLATE
        .replace("{context_str}", &format_context(nodes))
        .replace("{query_str}", query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Node;

    fn node(path: &str, text: &str) -> ScoredNode {
        ScoredNode {
            node: Node {
                id: "id".to_string(),
                doc_id: "doc".to_string(),
                doc_path: path.to_string(),
                file_name: "faq.txt".to_string(),
                title: None,
                headings: Vec::new(),
                chunk_index: 0,
                chunk_hash: "hash".to_string(),
                text: text.to_string(),
            },
            score: 0.9,
        }
    }

    #[test]
    fn test_condense_prompt_includes_history_and_question() {
        let history = vec![
            ChatMessage::user("How do I create a club?"),
            ChatMessage::assistant("Use the clubs page."),
        ];
        let prompt = condense_prompt(&history, "Can I rename it?");

        assert!(prompt.contains("Human: How do I create a club?\nAssistant: Use the clubs page."));
        assert!(prompt.contains("<Follow Up Message>\nCan I rename it?"));
        assert!(prompt.ends_with("<Standalone question>\n"));
    }

    #[test]
    fn test_qa_prompt_lists_context() {
        let nodes = vec![
            node("/data/clubs.txt", "Clubs have captains."),
            node("/data/cups.txt", "Cups run weekly."),
        ];
        let prompt = qa_prompt(&nodes, "Who leads a club?");

        assert!(prompt.contains(
            "file_path: /data/clubs.txt\n\nClubs have captains.\n\nfile_path: /data/cups.txt\n\nCups run weekly."
        ));
        assert!(prompt.ends_with("Query: Who leads a club?\nAnswer: "));
    }
}
