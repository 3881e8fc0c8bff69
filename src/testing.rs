//! Test doubles shared by unit tests

use crate::chat::{ChatEngine, ChatHistory, ChatReply};
use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::llm::{ChatMessage, ChatModel};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Deterministic bag-of-words embedder: each lowercase word lands in one bucket
pub struct KeywordEmbedder {
    dimension: usize,
    model: String,
    calls: AtomicUsize,
    texts_embedded: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self::with_model(dimension, "keyword-test")
    }

    pub fn with_model(dimension: usize, model: &str) -> Self {
        Self {
            dimension,
            model: model.to_string(),
            calls: AtomicUsize::new(0),
            texts_embedded: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn texts_embedded(&self) -> usize {
        self.texts_embedded.load(Ordering::SeqCst)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            let word = word.to_lowercase();
            let bucket = blake3::hash(word.as_bytes()).as_bytes()[0] as usize % self.dimension;
            v[bucket] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts_embedded.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Chat model that replays scripted replies and records every request
#[derive(Default)]
pub struct ScriptedChatModel {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChatModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.push(Ok(text.to_string()));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.push(Err(Error::Llm(message.to_string())));
        self
    }

    fn push(&self, reply: Result<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        let next = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        next.unwrap_or_else(|| Err(Error::Llm("no scripted reply left".to_string())))
    }

    fn model_name(&self) -> &str {
        "scripted-test"
    }
}

/// Chat engine that echoes the message it was given, or fails on demand
#[derive(Default)]
pub struct EchoEngine {
    fail_on: Option<String>,
    calls: AtomicUsize,
}

impl EchoEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every turn whose message starts with `prefix`
    pub fn failing_on(prefix: &str) -> Self {
        Self {
            fail_on: Some(prefix.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatEngine for EchoEngine {
    async fn chat(&self, history: &mut ChatHistory, message: &str) -> Result<ChatReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(prefix) = &self.fail_on {
            if message.starts_with(prefix.as_str()) {
                return Err(Error::Llm("provider unavailable: secret-key-123".to_string()));
            }
        }
        let response = format!("echo[{}]: {}", history.len(), message);
        // Give concurrent turns a chance to interleave
        tokio::task::yield_now().await;
        history.push(ChatMessage::user(message));
        history.push(ChatMessage::assistant(response.clone()));
        Ok(ChatReply {
            response,
            sources: Vec::new(),
            standalone_question: message.to_string(),
        })
    }
}
