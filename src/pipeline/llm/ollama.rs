use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{map_send_error, GenerationOptions, LlmClient, LlmError};

/// Ollama HTTP client for local LLM inference (`POST /api/generate`).
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl LlmClient for OllamaClient {
    fn generate(
        &self,
        system: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            options: OllamaOptions {
                temperature: options.temperature,
                num_predict: options.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| map_send_error(e, &self.base_url, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| LlmError::Response(e.to_string()))?;

        tracing::debug!(model = %self.model, chars = parsed.response.len(), "Ollama generation complete");
        Ok(parsed.response)
    }

    fn label(&self) -> String {
        format!("ollama:{}", self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", "medgemma", 60).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.timeout_secs, 60);
        assert_eq!(client.label(), "ollama:medgemma");
    }

    #[test]
    fn request_carries_temperature() {
        let body = OllamaGenerateRequest {
            model: "medgemma",
            prompt: "p",
            system: "s",
            stream: false,
            options: OllamaOptions {
                temperature: 0.1,
                num_predict: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert!((json["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
        assert!(json["options"].get("num_predict").is_none());
    }

    #[test]
    fn unreachable_server_is_connection_error() {
        let client = OllamaClient::new("http://127.0.0.1:9", "medgemma", 2).unwrap();
        let err = client
            .generate("system", "prompt", &GenerationOptions::default())
            .unwrap_err();
        assert!(matches!(err, LlmError::Connection(_)), "got {err:?}");
    }
}
