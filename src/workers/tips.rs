// src/workers/tips.rs — Advisory answers about content strategy
//
// Output is advisory prose for the user, never a draft. The orchestrator
// neither stores it on the session nor persists it.

use crate::core::types::{GeneratedPost, PromptTrace};
use crate::infra::errors::PostwrightError;

use super::GenerationHandle;

const SYSTEM_PROMPT: &str = "\
You are a LinkedIn engagement expert. Answer the user's question with \
specific, actionable advice grounded in LinkedIn best practices and \
algorithm behavior. Keep it brief: a short intro and 3-5 concrete tips. \
Respond in plain prose, not JSON.";

pub struct TipsWorker {
    gen: GenerationHandle,
}

impl TipsWorker {
    pub fn new(gen: GenerationHandle) -> Self {
        Self { gen }
    }

    pub async fn run(
        &self,
        question: &str,
        current_draft: Option<&str>,
    ) -> Result<(GeneratedPost, PromptTrace), PostwrightError> {
        let prompt = build_user_prompt(question, current_draft);
        self.gen.generate("tips", SYSTEM_PROMPT, &prompt).await
    }
}

fn build_user_prompt(question: &str, current_draft: Option<&str>) -> String {
    let mut p = String::with_capacity(512);

    p.push_str("Question: ");
    p.push_str(question);
    p.push('\n');

    if let Some(draft) = current_draft {
        p.push_str("\nFor context, the post currently being drafted:\n");
        p.push_str(draft);
        p.push('\n');
    }

    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_draft_context_when_present() {
        let p = build_user_prompt("best time to post?", Some("My draft text"));
        assert!(p.contains("best time to post?"));
        assert!(p.contains("My draft text"));
    }

    #[test]
    fn test_prompt_without_draft() {
        let p = build_user_prompt("best time to post?", None);
        assert!(!p.contains("currently being drafted"));
    }
}
