use crate::config::{Config, GenerationSettings, SafetySetting};
use crate::error::UpstreamError;
use crate::events::{Message, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;
use tracing::{debug, warn};

/// Returned in place of a reply when the model answers without any text.
pub const EMPTY_REPLY_FALLBACK: &str = "I'm sorry, I couldn't generate a response at the moment.";

/// Role tag understood by the upstream model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    User,
    Model,
}

impl From<Role> for WireRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Assistant => WireRole::Model,
            Role::User => WireRole::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePart {
    pub text: String,
}

/// One turn of the wire history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireContent {
    pub role: WireRole,
    pub parts: Vec<WirePart>,
}

impl From<&Message> for WireContent {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role().into(),
            parts: vec![WirePart {
                text: message.api_content().to_string(),
            }],
        }
    }
}

/// Turns a conversation history into the model's next reply.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, history: &[WireContent]) -> Result<String, UpstreamError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: &'a [WireContent],
    generation_config: WireGenerationConfig,
    safety_settings: &'a [SafetySetting],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f64,
    top_k: u32,
    top_p: f64,
    max_output_tokens: u32,
}

impl From<&GenerationSettings> for WireGenerationConfig {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            temperature: settings.temperature,
            top_k: settings.top_k,
            top_p: settings.top_p,
            max_output_tokens: settings.max_output_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Client for the Generative Language `generateContent` endpoint
#[derive(Clone)]
pub struct GeminiClient {
    config: Config,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: Config) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Build the JSON request body
    pub fn request_body(&self, history: &[WireContent]) -> serde_json::Value {
        let request = GenerateRequest {
            contents: history,
            generation_config: (&self.config.generation).into(),
            safety_settings: &self.config.safety_settings,
        };
        // Plain data with string keys; serialization cannot fail.
        serde_json::to_value(request).unwrap_or_default()
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, history: &[WireContent]) -> Result<String, UpstreamError> {
        let api_key = self.config.api_key().ok_or(UpstreamError::MissingApiKey)?;
        let url = self.endpoint();

        debug!(model = %self.config.model, turns = history.len(), "Gemini API request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", api_key)
            .json(&self.request_body(history))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Gemini API error");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        extract_reply(&body)
    }
}

/// Pull `candidates[0].content.parts[0].text` out of a response body.
pub fn extract_reply(body: &str) -> Result<String, UpstreamError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| UpstreamError::Malformed(e.to_string()))?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .filter(|text| !text.is_empty());

    Ok(text.unwrap_or_else(|| EMPTY_REPLY_FALLBACK.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MessageId;
    use serde_json::json;

    fn client() -> GeminiClient {
        GeminiClient::new(Config::default()).unwrap()
    }

    #[test]
    fn assistant_messages_map_to_model_role() {
        let user = Message::new(MessageId(1), Role::User, "Hi", "Hi");
        let reply = Message::new(MessageId(2), Role::Assistant, "Hello!", "Hello!");

        assert_eq!(WireContent::from(&user).role, WireRole::User);
        assert_eq!(WireContent::from(&reply).role, WireRole::Model);
    }

    #[test]
    fn wire_content_carries_api_text_not_display_text() {
        let user = Message::new(MessageId(1), Role::User, "Q:", "Q: plus pdf");
        assert_eq!(WireContent::from(&user).parts[0].text, "Q: plus pdf");
    }

    #[test]
    fn request_body_matches_wire_format() {
        let history = vec![WireContent {
            role: WireRole::User,
            parts: vec![WirePart {
                text: "Hello".to_string(),
            }],
        }];

        let body = client().request_body(&history);

        assert_eq!(body["contents"], json!([{ "role": "user", "parts": [{ "text": "Hello" }] }]));
        assert_eq!(body["generationConfig"]["topK"], json!(40));
        assert_eq!(body["generationConfig"]["maxOutputTokens"], json!(1024));
        assert_eq!(
            body["safetySettings"][0],
            json!({ "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" })
        );
        assert_eq!(body["safetySettings"].as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let mut config = Config::default();
        config.base_url = "http://localhost:9000/models/".to_string();
        config.model = "test-model".to_string();
        let client = GeminiClient::new(config).unwrap();

        assert_eq!(client.endpoint(), "http://localhost:9000/models/test-model:generateContent");
    }

    #[test]
    fn extracts_first_candidate_text() {
        let body = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "first" }, { "text": "second" }], "role": "model" } },
                { "content": { "parts": [{ "text": "other" }] } }
            ]
        })
        .to_string();

        assert_eq!(extract_reply(&body).unwrap(), "first");
    }

    #[test]
    fn missing_text_falls_back() {
        assert_eq!(extract_reply("{}").unwrap(), EMPTY_REPLY_FALLBACK);
        assert_eq!(
            extract_reply(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap(),
            EMPTY_REPLY_FALLBACK
        );
        assert_eq!(
            extract_reply(r#"{"candidates":[{"content":{"parts":[{"text":""}]}}]}"#).unwrap(),
            EMPTY_REPLY_FALLBACK
        );
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(extract_reply("<html>"), Err(UpstreamError::Malformed(_))));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let config = Config {
            api_key: None,
            base_url: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        };
        if config.has_api_key() {
            // GEMINI_API_KEY is set in this environment
            return;
        }
        let client = GeminiClient::new(config).unwrap();
        let result = client.generate(&[]).await;
        assert!(matches!(result, Err(UpstreamError::MissingApiKey)));
    }
}
