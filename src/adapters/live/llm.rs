//! Live adapter for the `LlmClient` port using an OpenAI-compatible
//! chat-completions endpoint.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ports::llm::{ChatMessage, CompletionRequest, CompletionResponse, LlmClient, LlmFuture};

/// Default service root when `OPENAI_BASE_URL` is not configured.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Live LLM client that calls the chat-completions API.
pub struct LiveLlmClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LiveLlmClient {
    /// Creates a client authenticating with `api_key` against `base_url`
    /// (or [`DEFAULT_BASE_URL`]).
    #[must_use]
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Request body sent to the chat-completions API.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

/// Structured-output selector.
#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl<'a> From<&'a CompletionRequest> for ChatRequest<'a> {
    fn from(request: &'a CompletionRequest) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            top_p: request.top_p,
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
            response_format: request.json_response.then_some(ResponseFormat { kind: "json_object" }),
        }
    }
}

/// Top-level response from the chat-completions API.
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Token usage reported by the API.
#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Error response from the API.
#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub(crate) fn parse_response(
    body: &str,
) -> Result<CompletionResponse, Box<dyn std::error::Error + Send + Sync>> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(
        |e| -> Box<dyn std::error::Error + Send + Sync> {
            format!("Failed to parse completion response: {e}").into()
        },
    )?;

    let choice = parsed.choices.into_iter().next().ok_or("Completion response has no choices")?;
    let text = choice.message.content.ok_or("Completion response has no message content")?;
    let (prompt_tokens, completion_tokens) =
        parsed.usage.map_or((0, 0), |u| (u.prompt_tokens, u.completion_tokens));

    Ok(CompletionResponse { text, prompt_tokens, completion_tokens })
}

impl LlmClient for LiveLlmClient {
    fn complete(&self, request: &CompletionRequest) -> LlmFuture<'_> {
        let request = request.clone();

        Box::pin(async move {
            let body = ChatRequest::from(&request);
            debug!(model = %request.model, messages = request.messages.len(), "sending completion");

            let response = self
                .client
                .post(self.endpoint())
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> {
                    format!("Completion request failed: {e}").into()
                })?;

            let status = response.status();
            let response_text =
                response.text().await.map_err(|e| -> Box<dyn std::error::Error + Send + Sync> {
                    format!("Failed to read completion response: {e}").into()
                })?;

            if !status.is_success() {
                let msg = serde_json::from_str::<ApiError>(&response_text)
                    .map(|e| e.error.message)
                    .unwrap_or(response_text);
                return Err(format!("Completion API error ({}): {msg}", status.as_u16()).into());
            }

            parse_response(&response_text)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use serde_json::json;

    fn request(json_response: bool) -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4-1106-preview".into(),
            messages: vec![
                ChatMessage::new(Role::System, "You are helpful."),
                ChatMessage::new(Role::User, "hi"),
            ],
            temperature: 0.25,
            top_p: 0.5,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            json_response,
        }
    }

    #[test]
    fn body_omits_response_format_by_default() {
        let req = request(false);
        let body = serde_json::to_value(ChatRequest::from(&req)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "gpt-4-1106-preview",
                "messages": [
                    {"role": "system", "content": "You are helpful."},
                    {"role": "user", "content": "hi"},
                ],
                "temperature": 0.25,
                "top_p": 0.5,
                "frequency_penalty": 0.0,
                "presence_penalty": 0.0,
            })
        );
    }

    #[test]
    fn body_requests_json_object_when_flagged() {
        let req = request(true);
        let body = serde_json::to_value(ChatRequest::from(&req)).unwrap();
        assert_eq!(body["response_format"], json!({"type": "json_object"}));
    }

    #[test]
    fn parses_first_choice_and_usage() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "hello"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;
        let response = parse_response(body).unwrap();
        assert_eq!(
            response,
            CompletionResponse { text: "hello".into(), prompt_tokens: 12, completion_tokens: 3 }
        );
    }

    #[test]
    fn parse_rejects_malformed_body() {
        let err = parse_response("not json").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse completion response"));
    }

    #[test]
    fn parse_rejects_empty_choices() {
        let err = parse_response(r#"{"choices": []}"#).unwrap_err();
        assert_eq!(err.to_string(), "Completion response has no choices");
    }

    #[test]
    fn parse_rejects_null_content() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let err = parse_response(body).unwrap_err();
        assert_eq!(err.to_string(), "Completion response has no message content");
    }

    #[test]
    fn endpoint_joins_base_url() {
        let client = LiveLlmClient::new("sk-test", Some("http://localhost:8080/".into()));
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}
