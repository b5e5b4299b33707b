// src/workers/optimize.rs — LinkedIn-specific optimization pass

use crate::core::types::{DraftRequest, GeneratedPost, PromptTrace};
use crate::infra::errors::PostwrightError;

use super::GenerationHandle;

const SYSTEM_PROMPT: &str = "\
You are a LinkedIn optimization expert. Enhance the given post for maximum \
engagement without changing what it is about.

Optimization guidelines:
1. Hook: the first line must earn the click on \"see more\"
2. Readability: short paragraphs, deliberate whitespace, selective emoji
3. Hashtags: 3-5 relevant, current hashtags
4. Call-to-action: one clear, specific ask
5. Length: stay within LinkedIn's sweet spot for the given length target

Return JSON with: content, hashtags, suggested_time, linkedin_tips.";

pub struct OptimizeWorker {
    gen: GenerationHandle,
}

impl OptimizeWorker {
    pub fn new(gen: GenerationHandle) -> Self {
        Self { gen }
    }

    /// Optimize a draft. `instruction` carries the user's own ask on the
    /// standalone path; the create second-pass leaves it empty.
    pub async fn run(
        &self,
        draft_text: &str,
        hashtags: &[String],
        instruction: Option<&str>,
        prefs: &DraftRequest,
    ) -> Result<(GeneratedPost, PromptTrace), PostwrightError> {
        let prompt = build_user_prompt(draft_text, hashtags, instruction, prefs);
        self.gen.generate("optimize", SYSTEM_PROMPT, &prompt).await
    }
}

fn build_user_prompt(
    draft_text: &str,
    hashtags: &[String],
    instruction: Option<&str>,
    prefs: &DraftRequest,
) -> String {
    let mut p = String::with_capacity(draft_text.len() + 512);

    p.push_str("Optimize this LinkedIn post:\n\n");
    p.push_str(draft_text);
    p.push_str("\n\n");

    if !hashtags.is_empty() {
        p.push_str(&format!("Current hashtags: {}\n", hashtags.join(", ")));
    }
    if let Some(instruction) = instruction {
        p.push_str(&format!("Requested focus: {instruction}\n"));
    }
    p.push_str(&format!("Industry: {}\n", prefs.industry));
    p.push_str(&format!("Tone: {}\n", prefs.tone));

    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_draft_and_hashtags() {
        let p = build_user_prompt(
            "We shipped v2 today.",
            &["launch".into(), "saas".into()],
            None,
            &DraftRequest::default(),
        );
        assert!(p.contains("We shipped v2 today."));
        assert!(p.contains("launch, saas"));
        assert!(!p.contains("Requested focus"));
    }

    #[test]
    fn test_prompt_carries_standalone_instruction() {
        let p = build_user_prompt(
            "We shipped v2 today.",
            &[],
            Some("tighten the structure"),
            &DraftRequest::default(),
        );
        assert!(p.contains("Requested focus: tighten the structure"));
    }
}
