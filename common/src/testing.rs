//! deterministic stand-ins for the model provider, shared by unit tests

use crate::error::{Result, Txt2SqlError};
use crate::llm::model::{ChatModel, Embedder, Message, ToolSpec};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

pub const MOCK_DIMENSIONS: usize = 256;

/// bag-of-words embedder: each lowercase word bumps one hashed bucket
pub struct MockEmbedder;

impl MockEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; MOCK_DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|w| !w.is_empty())
        {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
            v[bucket as usize % MOCK_DIMENSIONS] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(Txt2SqlError::Provider("embedding service unavailable".to_string()))
    }
}

/// replays canned assistant replies in order and records every request
pub struct ScriptedChat {
    replies: Mutex<VecDeque<Message>>,
    pub requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedChat {
    pub fn new(replies: Vec<Message>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn chat(&self, messages: &[Message], _tools: &[ToolSpec]) -> Result<Message> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Txt2SqlError::Provider("script exhausted".to_string()))
    }
}
