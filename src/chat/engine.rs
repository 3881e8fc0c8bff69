//! Condense-question chat engine

use super::{condense_prompt, qa_prompt, ChatEngine, ChatHistory, ChatReply};
use crate::config::Config;
use crate::error::Result;
use crate::index::VectorIndex;
use crate::llm::{ChatMessage, ChatModel};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Rewrites follow-ups into standalone questions, then answers them from retrieved context
pub struct CondenseQuestionEngine {
    index: VectorIndex,
    llm: Arc<dyn ChatModel>,
    top_k: usize,
    history_window: usize,
}

impl CondenseQuestionEngine {
    pub fn new(
        index: VectorIndex,
        llm: Arc<dyn ChatModel>,
        top_k: usize,
        history_window: usize,
    ) -> Self {
        Self {
            index,
            llm,
            top_k,
            history_window,
        }
    }

    pub fn from_config(config: &Config, index: VectorIndex, llm: Arc<dyn ChatModel>) -> Self {
        Self::new(
            index,
            llm,
            config.retrieval.top_k,
            config.chat.history_window,
        )
    }

    async fn standalone_question(&self, history: &ChatHistory, message: &str) -> Result<String> {
        if history.is_empty() {
            return Ok(message.to_string());
        }
        let prompt = condense_prompt(history.recent(self.history_window), message);
        let question = self.llm.complete(&[ChatMessage::user(prompt)]).await?;
        debug!(standalone = %question, "Condensed follow-up question");
        Ok(question)
    }
}

#[async_trait]
impl ChatEngine for CondenseQuestionEngine {
    async fn chat(&self, history: &mut ChatHistory, message: &str) -> Result<ChatReply> {
        let question = self.standalone_question(history, message).await?;
        let sources = self.index.retrieve(&question, self.top_k).await?;
        let prompt = qa_prompt(&sources, &question);
        let response = self.llm.complete(&[ChatMessage::user(prompt)]).await?;

        history.push(ChatMessage::user(message));
        history.push(ChatMessage::assistant(response.clone()));

        Ok(ChatReply {
            response,
            sources,
            standalone_question: question,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::Embedder;
    use crate::llm::Role;
    use crate::store::{Node, NodePoint, SqliteVectorStore, VectorStore};
    use crate::testing::{KeywordEmbedder, ScriptedChatModel};
    use tempfile::TempDir;

    const DIM: usize = 256;

    async fn index_with(tmp: &TempDir, texts: &[(&str, &str)]) -> VectorIndex {
        let embedder = Arc::new(KeywordEmbedder::new(DIM));
        let store = SqliteVectorStore::open(&tmp.path().join("vectors.sqlite3"), "quickstart", DIM)
            .await
            .unwrap();
        store.ensure_collection().await.unwrap();

        let mut points = Vec::new();
        for (i, (path, text)) in texts.iter().enumerate() {
            let hash = format!("hash-{}", i);
            points.push(NodePoint {
                node: Node {
                    id: Node::point_id(&hash).to_string(),
                    doc_id: format!("doc-{}", i),
                    doc_path: path.to_string(),
                    file_name: path.to_string(),
                    title: None,
                    headings: Vec::new(),
                    chunk_index: 0,
                    chunk_hash: hash,
                    text: text.to_string(),
                },
                vector: embedder.embed_query(text).await.unwrap(),
            });
        }
        store.upsert(points).await.unwrap();
        VectorIndex::new(Arc::new(store), embedder)
    }

    #[tokio::test]
    async fn test_first_turn_skips_condense() {
        let tmp = TempDir::new().unwrap();
        let index = index_with(&tmp, &[("clubs.txt", "Clubs are led by a captain.")]).await;
        let llm = Arc::new(ScriptedChatModel::new().reply("A captain leads each club."));
        let engine = CondenseQuestionEngine::new(index, llm.clone(), 2, 20);

        let mut history = ChatHistory::new();
        let reply = engine.chat(&mut history, "Who leads a club?").await.unwrap();

        assert_eq!(reply.response, "A captain leads each club.");
        assert_eq!(reply.standalone_question, "Who leads a club?");
        assert_eq!(reply.sources.len(), 1);

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0][0].content.contains("file_path: clubs.txt"));
        assert!(requests[0][0].content.contains("Query: Who leads a club?"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[0].content, "Who leads a club?");
        assert_eq!(history.messages()[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_follow_up_is_condensed_with_history() {
        let tmp = TempDir::new().unwrap();
        let index = index_with(
            &tmp,
            &[
                ("clubs.txt", "Clubs are led by a captain."),
                ("rename.txt", "Captains can rename a club in settings."),
            ],
        )
        .await;
        let llm = Arc::new(
            ScriptedChatModel::new()
                .reply("A captain leads each club.")
                .reply("Can a captain rename a club?")
                .reply("Yes, from the club settings."),
        );
        let engine = CondenseQuestionEngine::new(index, llm.clone(), 1, 20);

        let mut history = ChatHistory::new();
        engine.chat(&mut history, "Who leads a club?").await.unwrap();
        let reply = engine.chat(&mut history, "Can they rename it?").await.unwrap();

        assert_eq!(reply.standalone_question, "Can a captain rename a club?");
        assert_eq!(reply.response, "Yes, from the club settings.");
        assert_eq!(reply.sources[0].node.file_name, "rename.txt");

        let requests = llm.requests();
        assert_eq!(requests.len(), 3);
        let condense = &requests[1][0].content;
        assert!(condense.contains("Human: Who leads a club?"));
        assert!(condense.contains("Assistant: A captain leads each club."));
        assert!(condense.contains("Can they rename it?"));
        assert_eq!(history.len(), 4);
    }

    #[tokio::test]
    async fn test_failure_leaves_history_unchanged() {
        let tmp = TempDir::new().unwrap();
        let index = index_with(&tmp, &[("clubs.txt", "Clubs are led by a captain.")]).await;
        let llm = Arc::new(ScriptedChatModel::new().fail("provider down"));
        let engine = CondenseQuestionEngine::new(index, llm, 2, 20);

        let mut history = ChatHistory::new();
        assert!(engine.chat(&mut history, "Who leads a club?").await.is_err());
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_history_window_limits_condense_context() {
        let tmp = TempDir::new().unwrap();
        let index = index_with(&tmp, &[("clubs.txt", "Clubs are led by a captain.")]).await;
        let llm = Arc::new(
            ScriptedChatModel::new()
                .reply("standalone")
                .reply("answer"),
        );
        let engine = CondenseQuestionEngine::new(index, llm.clone(), 1, 2);

        let mut history = ChatHistory::new();
        history.push(ChatMessage::user("oldest question"));
        history.push(ChatMessage::assistant("oldest answer"));
        history.push(ChatMessage::user("recent question"));
        history.push(ChatMessage::assistant("recent answer"));

        engine.chat(&mut history, "follow up").await.unwrap();

        let condense = &llm.requests()[0][0].content;
        assert!(!condense.contains("oldest"));
        assert!(condense.contains("recent question"));
    }
}
