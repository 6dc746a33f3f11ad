use crate::config::ProviderSettings;
use crate::error::{Result, Txt2SqlError};
use crate::llm::model::{ChatModel, Embedder, Message, ModelConfig, ToolSpec};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// client for openai-compatible chat completion and embedding endpoints
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    chat: ModelConfig,
    embedding_model: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolSpec],
}

fn no_tools(tools: &&[ToolSpec]) -> bool {
    tools.is_empty()
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Message,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        chat: ModelConfig,
        embedding_model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            chat,
            embedding_model: embedding_model.into(),
        })
    }

    pub fn from_settings(settings: &ProviderSettings) -> Result<Self> {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            Txt2SqlError::Config("OPENAI_API_KEY is not set".to_string())
        })?;

        let chat = ModelConfig {
            model: settings.chat_model.clone(),
            ..ModelConfig::default()
        };

        Self::new(
            api_key,
            settings.base_url.clone(),
            chat,
            settings.embedding_model.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let response = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Txt2SqlError::Provider(format!(
                "{} returned {}: {}",
                path, status, detail
            )));
        }

        Ok(response.json::<R>().await?)
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    #[tracing::instrument(skip(self, messages, tools), fields(llm.model = %self.chat.model, message_count = messages.len(), tool_count = tools.len()))]
    async fn chat(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message> {
        let request = ChatCompletionRequest {
            model: &self.chat.model,
            messages,
            temperature: self.chat.temperature,
            max_tokens: self.chat.max_tokens,
            tools,
        };

        let response: ChatCompletionResponse = self.post("chat/completions", &request).await?;

        let reply = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| Txt2SqlError::Provider("completion returned no choices".to_string()))?;

        tracing::debug!(
            content_len = reply.content_str().len(),
            tool_calls = reply.tool_calls.len(),
            "received completion"
        );

        Ok(reply)
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    #[tracing::instrument(skip(self, texts), fields(llm.model = %self.embedding_model, input_count = texts.len()))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let response: EmbeddingResponse = self.post("embeddings", &request).await?;
        sort_embeddings(response.data, texts.len())
    }
}

/// order embeddings by their reported input index and check that every input got one
fn sort_embeddings(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(Txt2SqlError::Provider(format!(
            "expected {} embeddings, provider returned {}",
            expected,
            data.len()
        )));
    }

    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::model::ToolSpec;
    use serde_json::json;

    fn client(base_url: &str) -> OpenAiClient {
        OpenAiClient::new(
            "sk-test",
            base_url,
            ModelConfig::default(),
            "text-embedding-3-small",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let c = client("http://localhost:8080/v1/");
        assert_eq!(c.endpoint("embeddings"), "http://localhost:8080/v1/embeddings");
    }

    #[test]
    fn test_chat_request_omits_empty_tools() {
        let messages = vec![Message::system("sql only")];
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.0,
            max_tokens: None,
            tools: &[],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["temperature"], json!(0.0));
        assert!(value.get("tools").is_none());
        assert!(value.get("max_tokens").is_none());
        assert_eq!(value["messages"][0]["role"], "system");
    }

    #[test]
    fn test_chat_request_includes_tools() {
        let messages = vec![Message::user("how many customers?")];
        let tools = vec![ToolSpec::function(
            "run_sql",
            "Execute a SQL query and get the results.",
            json!({"type": "object"}),
        )];
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.0,
            max_tokens: Some(200),
            tools: &tools,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["tools"][0]["function"]["name"], "run_sql");
        assert_eq!(value["max_tokens"], 200);
    }

    #[test]
    fn test_sort_embeddings_by_index() {
        let data = vec![
            EmbeddingData { index: 1, embedding: vec![2.0] },
            EmbeddingData { index: 0, embedding: vec![1.0] },
        ];
        let sorted = sort_embeddings(data, 2).unwrap();
        assert_eq!(sorted, vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn test_sort_embeddings_count_mismatch() {
        let data = vec![EmbeddingData { index: 0, embedding: vec![1.0] }];
        assert!(matches!(sort_embeddings(data, 2), Err(Txt2SqlError::Provider(_))));
    }

    #[test]
    fn test_from_settings_requires_key() {
        let settings = ProviderSettings {
            api_key: None,
            base_url: "http://localhost".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            timeout_secs: 5,
        };
        assert!(matches!(
            OpenAiClient::from_settings(&settings),
            Err(Txt2SqlError::Config(_))
        ));
    }
}
