//! Startup initialization shared by the terminal and HTTP front ends
//!
//! Each step depends on the previous one; the first failure aborts startup.

use crate::chat::{ChatEngine, CondenseQuestionEngine};
use crate::config::Config;
use crate::embed::{Embedder, OpenAiEmbedder};
use crate::error::Result;
use crate::index::{IndexOptions, IndexStats, VectorIndex};
use crate::llm::{ChatModel, OpenAiChatModel};
use crate::loader::load_documents;
use crate::meta::MetaDb;
use crate::openai::OpenAiClient;
use crate::store::open_store;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A ready-to-use assistant: index built, chat engine constructed
#[derive(Clone)]
pub struct Assistant {
    engine: Arc<dyn ChatEngine>,
    stats: IndexStats,
}

impl Assistant {
    /// Run every startup step and construct the chat engine
    pub async fn bootstrap(config: &Config) -> Result<Self> {
        let (client, index, stats) = Self::prepare(config, true).await?;

        let llm: Arc<dyn ChatModel> = Arc::new(OpenAiChatModel::from_config(config, client));
        info!(model = llm.model_name(), "Chat engine ready");
        let engine = CondenseQuestionEngine::from_config(config, index, llm);

        Ok(Self::from_parts(Arc::new(engine), stats))
    }

    /// Load, open and index without constructing a chat engine
    pub async fn build_index(config: &Config, show_progress: bool) -> Result<IndexStats> {
        let (_, _, stats) = Self::prepare(config, show_progress).await?;
        Ok(stats)
    }

    /// Wire an assistant from an existing engine and its index statistics
    pub fn from_parts(engine: Arc<dyn ChatEngine>, stats: IndexStats) -> Self {
        Self { engine, stats }
    }

    pub fn engine(&self) -> Arc<dyn ChatEngine> {
        self.engine.clone()
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    async fn prepare(
        config: &Config,
        show_progress: bool,
    ) -> Result<(OpenAiClient, VectorIndex, IndexStats)> {
        let api_key = config.api_key()?;

        let documents = load_documents(Path::new(&config.data_dir), config.recursive)?;

        let client = OpenAiClient::from_config(config, api_key)?;
        let embedder: Arc<dyn Embedder> =
            Arc::new(OpenAiEmbedder::from_config(config, client.clone()));
        let store = open_store(config, embedder.dimension()).await?;
        let meta = MetaDb::connect(config).await?;

        let mut options = IndexOptions::from_config(config);
        options.show_progress = show_progress;
        let (index, stats) = VectorIndex::build(&documents, store, &meta, embedder, &options).await?;

        Ok((client, index, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatHistory;
    use crate::error::Error;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(tmp: &TempDir, key_env: &str) -> Config {
        let mut config = Config::default();
        config.data_dir = tmp.path().join("data").display().to_string();
        config.persist_dir = tmp.path().join("store").display().to_string();
        config.openai.api_key_env = key_env.to_string();
        config.embedding.model = "test-embedding".to_string();
        config.embedding.dimension = 3;
        config.embedding.batch_size = 1;
        config.embedding.retries = 0;
        config
    }

    #[tokio::test]
    async fn test_missing_credential_fails_first() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp, "KICKOFF_TEST_UNSET_KEY");

        let err = Assistant::bootstrap(&config).await.err().unwrap();
        assert!(matches!(err, Error::MissingCredential(_)));
    }

    #[tokio::test]
    async fn test_missing_data_dir_fails() {
        std::env::set_var("KICKOFF_TEST_KEY_NO_DATA", "sk-test");
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp, "KICKOFF_TEST_KEY_NO_DATA");

        let err = Assistant::bootstrap(&config).await.err().unwrap();
        assert!(matches!(err, Error::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_bootstrap_end_to_end() {
        std::env::set_var("KICKOFF_TEST_KEY_E2E", "sk-test");
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("data")).unwrap();
        std::fs::write(
            tmp.path().join("data").join("clubs.txt"),
            "Clubs are led by a captain who invites members.",
        )
        .unwrap();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"index": 0, "embedding": [1.0, 0.0, 0.0]}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "A captain leads each club."}}]
            })))
            .mount(&server)
            .await;

        let mut config = test_config(&tmp, "KICKOFF_TEST_KEY_E2E");
        config.openai.base_url = format!("{}/v1/", server.uri());

        let assistant = Assistant::bootstrap(&config).await.unwrap();
        assert_eq!(assistant.stats().documents_embedded, 1);
        assert_eq!(assistant.stats().points, 1);

        let mut history = ChatHistory::new();
        let reply = assistant
            .engine()
            .chat(&mut history, "Who leads a club?")
            .await
            .unwrap();
        assert_eq!(reply.response, "A captain leads each club.");
        assert_eq!(history.len(), 2);

        // A second startup reuses the persisted collection
        let stats = Assistant::build_index(&config, false).await.unwrap();
        assert_eq!(stats.documents_reused, 1);
        assert_eq!(stats.documents_embedded, 0);
    }
}
