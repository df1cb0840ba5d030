//! OpenAI Responses API client.
//!
//! Sends the whole transcript as a single `input` string together with a
//! stored prompt reference, and reads the aggregated output text back.

use serde_json::Value;

use super::{CompletionClient, CompletionError, CompletionSettings};

/// Client for the OpenAI Responses API.
#[derive(Clone)]
pub struct ResponsesClient {
    http: reqwest::Client,
    settings: CompletionSettings,
}

impl std::fmt::Debug for ResponsesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponsesClient")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ResponsesClient {
    /// Create a new client with the given settings.
    ///
    /// The settings' timeout is applied to every request.
    pub fn new(settings: CompletionSettings) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { http, settings })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1/responses",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn body(&self, prompt: &str) -> Value {
        let mut body = serde_json::json!({
            "prompt": { "id": self.settings.prompt_id },
            "input": prompt,
        });
        if let Some(model) = &self.settings.model {
            body["model"] = Value::String(model.clone());
        }
        body
    }
}

#[async_trait::async_trait]
impl CompletionClient for ResponsesClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let mut rb = self.http.post(self.url()).json(&self.body(prompt));
        if let Some(k) = &self.settings.api_key {
            rb = rb.bearer_auth(k);
        }

        let resp = rb.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let v: Value = resp
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;
        output_text(&v).ok_or_else(|| {
            CompletionError::Malformed("response carried no output_text".to_string())
        })
    }
}

/// Pull the completion text out of a Responses API payload.
///
/// Prefers the aggregated `output_text` field when the server supplies it,
/// otherwise concatenates every `output_text` part of every `message` item.
fn output_text(v: &Value) -> Option<String> {
    if let Some(text) = v.get("output_text").and_then(Value::as_str) {
        return Some(text.to_string());
    }

    let items = v.get("output")?.as_array()?;
    let mut text = String::new();
    let mut found = false;
    for item in items {
        if item.get("type").and_then(Value::as_str) != Some("message") {
            continue;
        }
        let Some(parts) = item.get("content").and_then(Value::as_array) else {
            continue;
        };
        for part in parts {
            if part.get("type").and_then(Value::as_str) == Some("output_text")
                && let Some(t) = part.get("text").and_then(Value::as_str)
            {
                text.push_str(t);
                found = true;
            }
        }
    }
    found.then_some(text)
}

/// Best-effort error message from an error body (`{"error": {"message": ...}}`).
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings(model: Option<&str>) -> CompletionSettings {
        CompletionSettings {
            base_url: "https://api.openai.com/".to_string(),
            api_key: None,
            prompt_id: "pmpt_test".to_string(),
            model: model.map(ToString::to_string),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let client = ResponsesClient::new(settings(None)).unwrap();
        assert_eq!(client.url(), "https://api.openai.com/v1/responses");
    }

    #[test]
    fn test_body_includes_prompt_reference() {
        let client = ResponsesClient::new(settings(None)).unwrap();
        let body = client.body("\n\nUser: hi");
        assert_eq!(body["prompt"]["id"], "pmpt_test");
        assert_eq!(body["input"], "\n\nUser: hi");
        assert!(body.get("model").is_none());

        let client = ResponsesClient::new(settings(Some("gpt-4o"))).unwrap();
        assert_eq!(client.body("x")["model"], "gpt-4o");
    }

    #[test]
    fn test_output_text_shortcut() {
        let v = serde_json::json!({ "output_text": "  hi there " });
        assert_eq!(output_text(&v).as_deref(), Some("  hi there "));
    }

    #[test]
    fn test_output_text_from_message_items() {
        let v = serde_json::json!({
            "output": [
                { "type": "reasoning", "summary": [] },
                {
                    "type": "message",
                    "role": "assistant",
                    "content": [
                        { "type": "output_text", "text": "Hello, " },
                        { "type": "refusal", "refusal": "no" },
                        { "type": "output_text", "text": "world" }
                    ]
                }
            ]
        });
        assert_eq!(output_text(&v).as_deref(), Some("Hello, world"));
    }

    #[test]
    fn test_output_text_missing() {
        let v = serde_json::json!({ "output": [{ "type": "reasoning" }] });
        assert!(output_text(&v).is_none());
        assert!(output_text(&serde_json::json!({})).is_none());
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"error": {"message": "Invalid prompt id", "type": "invalid_request_error"}}"#;
        assert_eq!(error_message(body), "Invalid prompt id");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}
