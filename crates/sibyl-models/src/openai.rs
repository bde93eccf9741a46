use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use sibyl_core::{ChatModel, ChatRequest, ChatResponse, Message, SibylError, TokenUsage};

use crate::backend::{ProviderBackend, ProviderRequest, ProviderResponse};

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f64>,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Chat model speaking the OpenAI chat-completions wire format.
pub struct OpenAiChatModel {
    config: OpenAiConfig,
    backend: Arc<dyn ProviderBackend>,
}

impl OpenAiChatModel {
    pub fn new(config: OpenAiConfig, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { config, backend }
    }

    fn build_request(&self, request: &ChatRequest) -> ProviderRequest {
        let messages: Vec<Value> = request.messages.iter().map(message_to_openai).collect();

        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
        });
        if let Some(temperature) = self.config.temperature {
            body["temperature"] = json!(temperature);
        }

        ProviderRequest {
            url: format!("{}/chat/completions", self.config.base_url),
            headers: vec![
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.config.api_key),
                ),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body,
        }
    }
}

fn message_to_openai(msg: &Message) -> Value {
    let role = match msg {
        Message::System { .. } => "system",
        Message::Human { .. } => "user",
        Message::AI { .. } => "assistant",
    };
    json!({ "role": role, "content": msg.content() })
}

fn parse_response(resp: &ProviderResponse) -> Result<ChatResponse, SibylError> {
    if resp.status != 200 {
        let message = resp.body["error"]["message"]
            .as_str()
            .unwrap_or("unknown error");
        return Err(SibylError::Model(format!(
            "API error ({}): {message}",
            resp.status
        )));
    }

    let content = resp.body["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();

    Ok(ChatResponse {
        message: Message::ai(content),
        usage: parse_usage(&resp.body["usage"]),
    })
}

fn parse_usage(usage: &Value) -> Option<TokenUsage> {
    let input_tokens = usage["prompt_tokens"].as_u64()? as u32;
    let output_tokens = usage["completion_tokens"].as_u64()? as u32;
    Some(TokenUsage {
        input_tokens,
        output_tokens,
        total_tokens: usage["total_tokens"]
            .as_u64()
            .map(|t| t as u32)
            .unwrap_or(input_tokens + output_tokens),
    })
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, SibylError> {
        let provider_request = self.build_request(&request);
        let response = self.backend.send(provider_request).await?;
        parse_response(&response)
    }
}
