//! OpenAI-compatible chat completions client (Groq by default).
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use w2g_core::config::ValidatorConfig;

use crate::message::{ChatMessage, ModelReply, Role, ToolCall, ToolSpec};
use crate::model::{ChatModel, ModelError};

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

/// Blocking client for the chat and vision models.
///
/// The API key is read once from the configured environment variable. A
/// missing key does not prevent construction; every call then fails with
/// [`ModelError::MissingApiKey`].
pub struct GroqClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    api_key_env: String,
    chat_model: String,
    vision_model: String,
    temperature: f32,
    max_tokens: u32,
}

impl std::fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("endpoint", &self.endpoint)
            .field("chat_model", &self.chat_model)
            .field("vision_model", &self.vision_model)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl GroqClient {
    pub fn from_config(cfg: &ValidatorConfig) -> Result<Self, ModelError> {
        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!(env = %cfg.api_key_env, "no model api key configured; photo validation will fail closed");
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| ModelError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", cfg.api_base.trim_end_matches('/')),
            api_key,
            api_key_env: cfg.api_key_env.clone(),
            chat_model: cfg.chat_model.clone(),
            vision_model: cfg.vision_model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        })
    }

    /// Asks the vision model to describe an image given as a `data:` URI.
    pub fn describe_image(&self, data_uri: &str, prompt: &str) -> Result<String, ModelError> {
        let payload = json!({
            "model": self.vision_model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": data_uri } }
                ]
            }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let reply = self.post(&payload)?;
        Ok(reply.content)
    }

    fn post(&self, payload: &Value) -> Result<ModelReply, ModelError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ModelError::MissingApiKey(self.api_key_env.clone()))?;

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(payload)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(e.to_string())
                } else {
                    ModelError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: truncate(&body, 320),
            });
        }

        let body: WireResponse = response
            .json()
            .map_err(|e| ModelError::Decode(e.to_string()))?;
        decode_reply(body)
    }
}

impl ChatModel for GroqClient {
    fn complete(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ModelReply, ModelError> {
        let mut payload = json!({
            "model": self.chat_model,
            "messages": messages.iter().map(encode_message).collect::<Vec<_>>(),
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        if !tools.is_empty() {
            payload["tools"] = Value::Array(tools.iter().map(encode_tool).collect());
        }
        self.post(&payload)
    }
}

fn encode_message(message: &ChatMessage) -> Value {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    let mut wire = json!({ "role": role, "content": message.content });
    if !message.tool_calls.is_empty() {
        wire["tool_calls"] = Value::Array(
            message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments.to_string(),
                        }
                    })
                })
                .collect(),
        );
    }
    if let Some(id) = &message.tool_call_id {
        wire["tool_call_id"] = json!(id);
    }
    if let Some(name) = &message.name {
        wire["name"] = json!(name);
    }
    wire
}

fn encode_tool(tool: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

fn decode_reply(body: WireResponse) -> Result<ModelReply, ModelError> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::Decode("response has no choices".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| {
            let arguments = if call.function.arguments.trim().is_empty() {
                Value::Object(Default::default())
            } else {
                serde_json::from_str(&call.function.arguments)
                    .map_err(|e| ModelError::Decode(format!("tool arguments: {}", e)))?
            };
            Ok(ToolCall {
                id: call.id,
                name: call.function.name,
                arguments,
            })
        })
        .collect::<Result<Vec<_>, ModelError>>()?;

    Ok(ModelReply {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
