// src/provider/mod.rs — Generation capability layer

pub mod google;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::infra::config::Config;
use crate::infra::errors::PostwrightError;

/// Core trait every text-generation backend implements. Workers compose a
/// prompt and call `generate`; no streaming, no tool use.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn models(&self) -> Vec<ModelInfo>;

    async fn generate(&self, request: GenerateRequest)
        -> Result<GenerateResponse, PostwrightError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub context_window: u32,
    pub max_output_tokens: u32,
    pub input_price_per_mtok: f64,
    pub output_price_per_mtok: f64,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub model: String,
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub text: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Reference to a specific model on a specific provider.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider: String,
    pub model: String,
}

impl ModelRef {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Parse "provider/model" format
    pub fn parse(s: &str) -> Option<Self> {
        let (provider, model) = s.split_once('/')?;
        Some(Self {
            provider: provider.to_string(),
            model: model.to_string(),
        })
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// Resolve the configured generator provider, wrapped in retry.
/// Currently Google Gemini is the only backend; the `ModelRef` form keeps
/// the door open for others without changing call sites.
pub fn resolve(config: &Config) -> Result<(Arc<dyn ModelProvider>, ModelRef), PostwrightError> {
    let model_ref = ModelRef::parse(&config.models.generator).ok_or_else(|| {
        PostwrightError::Config(format!(
            "models.generator must be 'provider/model', got '{}'",
            config.models.generator
        ))
    })?;

    let inner: Arc<dyn ModelProvider> = match model_ref.provider.as_str() {
        "google" => {
            let api_key =
                std::env::var("GOOGLE_API_KEY").map_err(|_| PostwrightError::NoProvider)?;
            Arc::new(google::GoogleProvider::new(api_key))
        }
        other => {
            return Err(PostwrightError::Config(format!(
                "Unknown provider '{other}'"
            )))
        }
    };

    Ok((Arc::new(retry::RetryProvider::new(inner)), model_ref))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── ModelRef ───────────────────────────────────────────────

    #[test]
    fn test_model_ref_parse() {
        let r = ModelRef::parse("google/gemini-2.5-flash").unwrap();
        assert_eq!(r.provider, "google");
        assert_eq!(r.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_model_ref_parse_invalid() {
        assert!(ModelRef::parse("no-slash").is_none());
    }

    #[test]
    fn test_model_ref_display() {
        let r = ModelRef::new("google", "gemini-2.5-flash");
        assert_eq!(r.to_string(), "google/gemini-2.5-flash");
    }

    // ─── TokenUsage ─────────────────────────────────────────────

    #[test]
    fn test_token_usage_total() {
        let u = TokenUsage {
            input_tokens: 120,
            output_tokens: 80,
        };
        assert_eq!(u.total(), 200);
    }
}
