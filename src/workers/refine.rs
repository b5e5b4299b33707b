// src/workers/refine.rs — Apply refinement cues to an existing draft

use crate::core::types::{CueSet, Draft, DraftRequest, GeneratedPost, PromptTrace};
use crate::infra::errors::PostwrightError;

use super::{length_guideline, GenerationHandle};

const SYSTEM_PROMPT: &str = "\
You are a professional LinkedIn editor. Rewrite the given post according to \
the instructions while keeping it engaging, concise, and LinkedIn-ready.

Hard rules:
- Preserve the subject matter and every key fact of the original post.
- Do not introduce factual claims that appear in neither the original post \
nor the instructions.
- Apply ALL instructions together in a single rewrite, not one at a time.

Return JSON with: content, hashtags (3-5), suggested_time, linkedin_tips (2-3).";

pub struct RefineWorker {
    gen: GenerationHandle,
}

impl RefineWorker {
    pub fn new(gen: GenerationHandle) -> Self {
        Self { gen }
    }

    pub async fn run(
        &self,
        draft: &Draft,
        cues: &CueSet,
        prefs: &DraftRequest,
    ) -> Result<(GeneratedPost, PromptTrace), PostwrightError> {
        let prompt = build_user_prompt(draft, cues, prefs);
        self.gen.generate("refine", SYSTEM_PROMPT, &prompt).await
    }
}

fn build_user_prompt(draft: &Draft, cues: &CueSet, prefs: &DraftRequest) -> String {
    let mut p = String::with_capacity(draft.text.len() + 512);

    p.push_str("Original post:\n");
    p.push_str(&draft.text);
    p.push_str("\n\nInstructions (apply all simultaneously):\n");
    p.push_str(&cues.describe());
    p.push_str("\n\nConstraints:\n");
    p.push_str(&format!("- Industry: {}\n", prefs.industry));
    p.push_str(&format!("- Tone: {}\n", prefs.tone));
    p.push_str(&format!(
        "- Length: {} ({})\n",
        prefs.length,
        length_guideline(&prefs.length)
    ));
    p.push_str("- Keep authenticity; avoid exaggeration.\n");
    p.push_str("- If not specified, infer reasonable hashtags.\n");

    p
}
