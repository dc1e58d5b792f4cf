//! Google Gemini backend.
//!
//! Sends one `generateContent` request per call with JSON structured output
//! enabled: `responseMimeType` is `application/json` and the capability's
//! output schema is passed as `responseSchema`. Media parts of the prompt are
//! sent inline.
//!
//! # Authentication
//!
//! Gemini API key, from `GOOGLE_API_KEY` or `GEMINI_API_KEY` (see
//! [`crate::config`]). A missing key fails before any network I/O.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::backend::{BackendError, GenerativeBackend};
use crate::prompts::{PromptPart, RenderedPrompt};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default number of retries on 429 / 5xx.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

// Keys of a JSON Schema that Gemini's `responseSchema` understands.
const SUPPORTED_SCHEMA_KEYS: &[&str] = &["type", "description", "properties", "items", "required", "enum"];

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for [`GeminiBackend`].
#[derive(Clone, PartialEq)]
pub struct GeminiConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub temperature: Option<f64>,
    pub request_timeout: Duration,
    pub max_retries: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: None,
            request_timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// GeminiBackend
// ---------------------------------------------------------------------------

/// Gemini `generateContent` client.
///
/// Holds one pooled HTTP client; cheap to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    config: GeminiConfig,
    name: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let name = format!("gemini/{}", config.model);
        Ok(Self {
            config,
            name,
            client,
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Build the `generationConfig` block.
    pub fn generation_config(&self, output_schema: &Value) -> Value {
        let mut config = Map::new();
        config.insert("responseMimeType".to_string(), json!("application/json"));
        config.insert("responseSchema".to_string(), to_gemini_schema(output_schema));
        if let Some(temperature) = self.config.temperature {
            config.insert("temperature".to_string(), json!(temperature));
        }
        Value::Object(config)
    }

    /// Build the complete request body for a prompt.
    pub fn build_request_body(&self, prompt: &RenderedPrompt, output_schema: &Value) -> Value {
        let parts: Vec<Value> = prompt
            .parts()
            .iter()
            .map(|part| match part {
                PromptPart::Text(text) => json!({ "text": text }),
                PromptPart::Media(uri) => json!({
                    "inlineData": {
                        "mimeType": uri.mime_type(),
                        "data": uri.data(),
                    }
                }),
            })
            .collect();

        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": self.generation_config(output_schema),
        })
    }

    /// Extract the structured payload from a `generateContent` response.
    ///
    /// The first candidate's text is parsed as JSON. Text that is not JSON is
    /// returned as a JSON string and left for output validation to reject.
    pub fn parse_response(response: &Value) -> Result<Value, BackendError> {
        if let Some(reason) = response
            .pointer("/promptFeedback/blockReason")
            .and_then(Value::as_str)
        {
            return Err(BackendError::InvalidResponse(format!(
                "prompt blocked: {}",
                reason
            )));
        }

        let candidate = response
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
            .ok_or_else(|| BackendError::InvalidResponse("no candidates".to_string()))?;

        let text: String = candidate
            .pointer("/content/parts")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            let finish = candidate
                .get("finishReason")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            return Err(BackendError::InvalidResponse(format!(
                "candidate has no text (finishReason: {})",
                finish
            )));
        }

        Ok(extract_json(&text).unwrap_or(Value::String(text)))
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        prompt: &RenderedPrompt,
        output_schema: &Value,
    ) -> Result<Value, BackendError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            BackendError::MissingCredentials(
                "Gemini API key not set. Set GOOGLE_API_KEY or GEMINI_API_KEY.".to_string(),
            )
        })?;

        let body = self.build_request_body(prompt, output_schema);
        let endpoint = self.endpoint();

        log::debug!(
            "GeminiBackend.generate: model={}, parts={}, media={}",
            self.config.model,
            prompt.parts().len(),
            prompt.media().count(),
        );

        let mut last_error = String::new();
        let mut retry_delay = Duration::from_secs(1);
        let attempts = self.config.max_retries + 1;

        for attempt in 0..attempts {
            if attempt > 0 {
                log::warn!("Gemini API retry attempt {} after {:?}", attempt, retry_delay);
                tokio::time::sleep(retry_delay).await;
                retry_delay *= 2;
            }

            let response = match self
                .client
                .post(&endpoint)
                .header("x-goog-api-key", api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = e.to_string();
                    continue;
                }
            };

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                last_error = format!("HTTP {}", status.as_u16());
                continue;
            }

            let response_text = response.text().await?;
            if !status.is_success() {
                return Err(BackendError::Status {
                    status: status.as_u16(),
                    body: truncate(&response_text, 500),
                });
            }

            let response_json: Value = serde_json::from_str(&response_text).map_err(|e| {
                BackendError::InvalidResponse(format!(
                    "body is not JSON ({}): {}",
                    e,
                    truncate(&response_text, 200)
                ))
            })?;

            if let Some(usage) = response_json.get("usageMetadata") {
                log::debug!("Gemini usage: {}", usage);
            }

            return Self::parse_response(&response_json);
        }

        Err(BackendError::Exhausted {
            attempts,
            last: last_error,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Convert a JSON Schema into the OpenAPI subset Gemini accepts.
///
/// Type names are upper-cased and unsupported keywords are dropped.
pub fn to_gemini_schema(schema: &Value) -> Value {
    let Some(object) = schema.as_object() else {
        return schema.clone();
    };

    let mut converted = Map::new();
    for (key, value) in object {
        if !SUPPORTED_SCHEMA_KEYS.contains(&key.as_str()) {
            continue;
        }
        let value = match (key.as_str(), value) {
            ("type", Value::String(t)) => Value::String(t.to_uppercase()),
            ("properties", Value::Object(props)) => Value::Object(
                props
                    .iter()
                    .map(|(name, prop)| (name.clone(), to_gemini_schema(prop)))
                    .collect(),
            ),
            ("items", items) => to_gemini_schema(items),
            _ => value.clone(),
        };
        converted.insert(key.clone(), value);
    }
    Value::Object(converted)
}

/// Parse `text` as JSON, falling back to its outermost `{...}` span.
fn extract_json(text: &str) -> Option<Value> {
    if let Ok(parsed) = serde_json::from_str::<Value>(text.trim()) {
        return Some(parsed);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, FieldSpec, ObjectSchema};

    fn backend(api_key: Option<&str>) -> GeminiBackend {
        GeminiBackend::new(GeminiConfig {
            api_key: api_key.map(String::from),
            temperature: Some(0.2),
            ..GeminiConfig::default()
        })
        .unwrap()
    }

    fn output_schema() -> Value {
        ObjectSchema::new(vec![
            FieldSpec::new("abuseDetected", FieldKind::Boolean),
            FieldSpec::new("explanation", FieldKind::String { min_length: 0 }),
            FieldSpec::new("sections", FieldKind::StringArray),
        ])
        .unwrap()
        .to_json_schema()
    }

    #[test]
    fn test_endpoint_and_name() {
        let backend = backend(None);
        assert_eq!(backend.name(), "gemini/gemini-2.0-flash");
        assert_eq!(
            backend.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let backend = backend(Some("secret-key"));
        let debug = format!("{:?}", backend.config());
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_to_gemini_schema() {
        let converted = to_gemini_schema(&output_schema());
        assert_eq!(converted["type"], "OBJECT");
        assert_eq!(converted["properties"]["abuseDetected"]["type"], "BOOLEAN");
        assert_eq!(converted["properties"]["sections"]["items"]["type"], "STRING");

        let with_length = to_gemini_schema(&json!({ "type": "string", "minLength": 3 }));
        assert_eq!(with_length, json!({ "type": "STRING" }));
    }

    #[test]
    fn test_build_request_body_with_media() {
        let template = crate::prompts::PromptTemplate::parse(
            "Digitize this.\nScanned Document: {{media url=doc}}",
        )
        .unwrap();
        let fields = json!({ "doc": "data:application/pdf;base64,aGVsbG8=" });
        let prompt = template.render_fields(fields.as_object().unwrap());

        let body = backend(None).build_request_body(&prompt, &output_schema());
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["text"], "Digitize this.\nScanned Document: ");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[1]["inlineData"]["data"], "aGVsbG8=");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["temperature"], 0.2);
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_parse_response_json_text() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "{\"abuseDetected\": true, " },
                    { "text": "\"explanation\": \"Third bail plea in six months.\"}" }
                ]},
                "finishReason": "STOP"
            }]
        });
        let parsed = GeminiBackend::parse_response(&response).unwrap();
        assert_eq!(parsed["abuseDetected"], true);
        assert_eq!(parsed["explanation"], "Third bail plea in six months.");
    }

    #[test]
    fn test_parse_response_fenced_json() {
        let response = json!({
            "candidates": [{ "content": { "parts": [
                { "text": "```json\n{\"digitizedText\": \"AFFIDAVIT\"}\n```" }
            ]}}]
        });
        let parsed = GeminiBackend::parse_response(&response).unwrap();
        assert_eq!(parsed, json!({ "digitizedText": "AFFIDAVIT" }));
    }

    #[test]
    fn test_parse_response_plain_text_is_string() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "I cannot help with that." }] } }]
        });
        let parsed = GeminiBackend::parse_response(&response).unwrap();
        assert_eq!(parsed, json!("I cannot help with that."));
    }

    #[test]
    fn test_parse_response_errors() {
        let blocked = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(matches!(
            GeminiBackend::parse_response(&blocked),
            Err(BackendError::InvalidResponse(msg)) if msg.contains("SAFETY")
        ));

        let empty = json!({ "candidates": [] });
        assert!(GeminiBackend::parse_response(&empty).is_err());

        let no_text = json!({ "candidates": [{ "finishReason": "MAX_TOKENS" }] });
        assert!(matches!(
            GeminiBackend::parse_response(&no_text),
            Err(BackendError::InvalidResponse(msg)) if msg.contains("MAX_TOKENS")
        ));
    }

    #[tokio::test]
    async fn test_generate_without_key_fails_before_network() {
        let prompt = RenderedPrompt::from_text("hello");
        let err = backend(None)
            .generate(&prompt, &output_schema())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::MissingCredentials(_)));
    }
}
