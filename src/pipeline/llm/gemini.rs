use std::time::Duration;

use serde_json::{json, Value};

use super::{map_send_error, GenerationOptions, LlmClient, LlmError};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    api_base: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::Configuration("Gemini API key is empty".into()));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            api_base: GEMINI_API_BASE.to_string(),
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }

    fn request_body(system: &str, prompt: &str, options: &GenerationOptions) -> Value {
        let mut generation_config = json!({ "temperature": options.temperature });
        if let Some(max) = options.max_output_tokens {
            generation_config["maxOutputTokens"] = json!(max);
        }
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": generation_config,
        });
        if !system.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        body
    }
}

/// Pull `candidates[0].content.parts[*].text` out of a response, joined.
fn candidate_text(response: &Value) -> Result<String, LlmError> {
    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| {
            let reason = response["candidates"][0]["finishReason"]
                .as_str()
                .or_else(|| response["promptFeedback"]["blockReason"].as_str())
                .unwrap_or("no candidates");
            LlmError::Response(format!("No text in Gemini response ({reason})"))
        })?;

    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.is_empty() {
        return Err(LlmError::Response("No text in Gemini response".into()));
    }
    Ok(text)
}

impl LlmClient for GeminiClient {
    fn generate(
        &self,
        system: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, self.model, self.api_key
        );
        let response = self
            .client
            .post(&url)
            .json(&Self::request_body(system, prompt, options))
            .send()
            .map_err(|e| map_send_error(e.without_url(), &self.api_base, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = response
            .json()
            .map_err(|e| LlmError::Response(e.without_url().to_string()))?;
        candidate_text(&parsed)
    }

    fn label(&self) -> String {
        format!("gemini:{}", self.model)
    }
}
