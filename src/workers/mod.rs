// src/workers/mod.rs — Generation strategies, one per intent
//
// Workers compose prompts and call the generation capability. They never
// touch session state or external services; the orchestrator owns both.

pub mod create;
pub mod optimize;
pub mod refine;
pub mod tips;

use std::sync::Arc;

use crate::core::types::{GeneratedPost, PromptTrace};
use crate::infra::errors::PostwrightError;
use crate::provider::{GenerateRequest, ModelProvider};

/// Shared plumbing for one worker's generation calls.
#[derive(Clone)]
pub struct GenerationHandle {
    provider: Arc<dyn ModelProvider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl GenerationHandle {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens,
        }
    }

    /// Run one generation call and parse the structured output. Empty
    /// content is a failure — a worker never hands back a blank draft.
    pub async fn generate(
        &self,
        worker: &'static str,
        system: &str,
        prompt: &str,
    ) -> Result<(GeneratedPost, PromptTrace), PostwrightError> {
        let response = self
            .provider
            .generate(GenerateRequest {
                model: self.model.clone(),
                system: Some(system.to_string()),
                prompt: prompt.to_string(),
                max_tokens: Some(self.max_tokens),
                temperature: Some(self.temperature),
            })
            .await?;

        let post = parse_generated(&response.text);
        if post.content.trim().is_empty() {
            return Err(PostwrightError::EmptyGeneration {
                worker: worker.into(),
            });
        }

        tracing::debug!(
            worker,
            model = %self.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Generation complete",
        );

        Ok((
            post,
            PromptTrace {
                worker,
                model: self.model.clone(),
                prompt: prompt.to_string(),
            },
        ))
    }
}

/// Parse a model response into a `GeneratedPost`. Models are asked for JSON
/// but don't always comply; raw text becomes the post body unchanged.
pub fn parse_generated(raw: &str) -> GeneratedPost {
    let stripped = strip_code_fences(raw.trim());

    if let Ok(post) = serde_json::from_str::<GeneratedPost>(stripped) {
        if !post.content.trim().is_empty() {
            return post;
        }
    }

    GeneratedPost {
        content: raw.trim().to_string(),
        ..Default::default()
    }
}

/// Remove a surrounding markdown code fence (```json ... ```), if any.
fn strip_code_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Skip the language tag on the opening fence line.
    let rest = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Word-count guidance for a length preference.
pub fn length_guideline(length: &str) -> &'static str {
    match length {
        "short" => "100-200 words",
        "long" => "400-600 words",
        _ => "200-400 words",
    }
}
