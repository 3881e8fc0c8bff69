//! Default values for configuration

/// Default directory holding the documents to index
pub fn default_data_dir() -> String {
    "data".to_string()
}

/// Default directory holding the persisted vector store and metadata
pub fn default_persist_dir() -> String {
    "chroma_db".to_string()
}

/// Default collection name
pub fn default_collection_name() -> String {
    "quickstart".to_string()
}

/// Default environment variable holding the provider API key
pub fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Default OpenAI-compatible API base URL (trailing slash required for joins)
pub fn default_openai_base_url() -> String {
    std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1/".to_string())
}

/// Default request timeout in seconds for provider calls
pub fn default_openai_timeout() -> u64 {
    60
}

/// Default chat model (4o-mini is cheap)
pub fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Default sampling temperature
pub fn default_llm_temperature() -> f32 {
    0.1
}

/// Default embedding model
pub fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

/// Default embedding dimension (matches text-embedding-ada-002)
pub fn default_embedding_dimension() -> usize {
    1536
}

/// Default batch size for embedding
pub fn default_embedding_batch_size() -> usize {
    32
}

/// Default number of retries for embedding requests
pub fn default_embedding_retries() -> usize {
    2
}

/// Default maximum characters per chunk
pub fn default_chunk_max_chars() -> usize {
    2000
}

/// Default minimum characters per chunk
pub fn default_chunk_min_chars() -> usize {
    50
}

/// Default overlap characters between chunks
pub fn default_chunk_overlap() -> usize {
    200
}

/// Default: prefer heading boundaries
pub fn default_prefer_heading_boundaries() -> bool {
    true
}

/// Default number of passages retrieved per question
pub fn default_retrieval_top_k() -> usize {
    2
}

/// Default number of history messages shown to the condense step
pub fn default_history_window() -> usize {
    20
}

/// Default vector store backend
pub fn default_vector_store_backend() -> String {
    "sqlite".to_string()
}

/// Default Qdrant gRPC URL for local development (port 6334, not 6333 REST)
pub fn default_qdrant_url() -> String {
    std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6334".to_string())
}

/// Default HTTP bind host
pub fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

/// Default HTTP bind port
pub fn default_server_port() -> u16 {
    8000
}

/// Default cap on concurrent HTTP conversations
pub fn default_max_sessions() -> usize {
    1000
}

/// Default idle lifetime of an HTTP conversation (30 minutes)
pub fn default_session_idle_secs() -> u64 {
    30 * 60
}
