// src/provider/google.rs — Google Generative AI (Gemini) provider

use async_trait::async_trait;

use super::{GenerateRequest, GenerateResponse, ModelInfo, ModelProvider, TokenUsage};
use crate::infra::errors::PostwrightError;

pub struct GoogleProvider {
    api_key: String,
    client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn base_url(&self) -> &str {
        "https://generativelanguage.googleapis.com/v1beta"
    }

    /// Build the generateContent body from a GenerateRequest.
    fn build_request_body(&self, request: &GenerateRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
        });

        if let Some(ref system) = request.system {
            body["system_instruction"] = serde_json::json!({
                "parts": [{ "text": system }],
            });
        }

        let mut gen_config = serde_json::json!({});
        if let Some(max_tokens) = request.max_tokens {
            gen_config["maxOutputTokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temp) = request.temperature {
            gen_config["temperature"] = serde_json::json!(temp);
        }
        if gen_config != serde_json::json!({}) {
            body["generationConfig"] = gen_config;
        }

        body
    }
}

#[async_trait]
impl ModelProvider for GoogleProvider {
    fn id(&self) -> &str {
        "google"
    }

    fn name(&self) -> &str {
        "Google"
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gemini-2.5-flash".into(),
                name: "Gemini 2.5 Flash".into(),
                context_window: 1_048_576,
                max_output_tokens: 65_536,
                input_price_per_mtok: 0.15,
                output_price_per_mtok: 0.60,
            },
            ModelInfo {
                id: "gemini-2.5-pro".into(),
                name: "Gemini 2.5 Pro".into(),
                context_window: 1_048_576,
                max_output_tokens: 65_536,
                input_price_per_mtok: 1.25,
                output_price_per_mtok: 10.0,
            },
            ModelInfo {
                id: "gemini-2.0-flash".into(),
                name: "Gemini 2.0 Flash".into(),
                context_window: 1_048_576,
                max_output_tokens: 8_192,
                input_price_per_mtok: 0.10,
                output_price_per_mtok: 0.40,
            },
        ]
    }

    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerateResponse, PostwrightError> {
        let body = self.build_request_body(&request);

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url(),
            request.model,
            self.api_key,
        );

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PostwrightError::Provider {
                provider: "google".into(),
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5);
            return Err(PostwrightError::RateLimited {
                provider: "google".into(),
                retry_after_ms: retry_after * 1000,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(PostwrightError::Provider {
                provider: "google".into(),
                message: format!("HTTP {}: {}", status, error_body),
                retriable: status.is_server_error(),
            });
        }

        let resp: serde_json::Value =
            response.json().await.map_err(|e| PostwrightError::Provider {
                provider: "google".into(),
                message: format!("Failed to parse response: {}", e),
                retriable: false,
            })?;

        let text = resp["candidates"][0]["content"]["parts"]
            .as_array()
            .unwrap_or(&vec![])
            .iter()
            .filter_map(|p| p["text"].as_str())
            .collect::<Vec<_>>()
            .join("");

        let usage = TokenUsage {
            input_tokens: resp["usageMetadata"]["promptTokenCount"]
                .as_u64()
                .unwrap_or(0) as u32,
            output_tokens: resp["usageMetadata"]["candidatesTokenCount"]
                .as_u64()
                .unwrap_or(0) as u32,
        };

        Ok(GenerateResponse { text, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_includes_system_instruction() {
        let provider = GoogleProvider::new("test-key".into());
        let body = provider.build_request_body(&GenerateRequest {
            model: "gemini-2.5-flash".into(),
            system: Some("You are an editor.".into()),
            prompt: "Rewrite this".into(),
            max_tokens: Some(1024),
            temperature: Some(0.7),
        });

        assert_eq!(
            body["system_instruction"]["parts"][0]["text"],
            "You are an editor."
        );
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Rewrite this");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_request_body_omits_empty_generation_config() {
        let provider = GoogleProvider::new("test-key".into());
        let body = provider.build_request_body(&GenerateRequest {
            model: "gemini-2.5-flash".into(),
            system: None,
            prompt: "Hello".into(),
            max_tokens: None,
            temperature: None,
        });

        assert!(body.get("generationConfig").is_none());
        assert!(body.get("system_instruction").is_none());
    }

    #[test]
    fn test_models_catalog() {
        let provider = GoogleProvider::new("k".into());
        let models = provider.models();
        assert!(models.iter().any(|m| m.id == "gemini-2.5-flash"));
    }
}
