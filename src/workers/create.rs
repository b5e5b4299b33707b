// src/workers/create.rs — First-draft generation from a topic or photo caption

use crate::core::types::{DraftRequest, GeneratedPost, PromptTrace, SourceType};
use crate::infra::errors::PostwrightError;

use super::{length_guideline, GenerationHandle};

pub struct CreateWorker {
    gen: GenerationHandle,
}

impl CreateWorker {
    pub fn new(gen: GenerationHandle) -> Self {
        Self { gen }
    }

    pub async fn run(
        &self,
        topic: &str,
        source: SourceType,
        prefs: &DraftRequest,
    ) -> Result<(GeneratedPost, PromptTrace), PostwrightError> {
        let system = build_system_prompt(prefs);
        let prompt = build_user_prompt(topic, source, prefs);
        self.gen.generate("create", &system, &prompt).await
    }
}

fn build_system_prompt(prefs: &DraftRequest) -> String {
    let mut p = String::with_capacity(1024);

    p.push_str(&format!(
        "You are an expert LinkedIn content creator specializing in {}.\n\n",
        prefs.industry
    ));
    p.push_str("Create engaging, professional LinkedIn content that:\n");
    p.push_str("- Provides genuine value to the audience\n");
    p.push_str("- Uses storytelling and personal insights\n");
    p.push_str(&format!("- Maintains a {} tone\n", prefs.tone));
    p.push_str("- Starts with a compelling hook and ends with a question or call-to-action\n\n");
    p.push_str(
        "The text must be publish-ready: no meta-commentary, no placeholders, \
         no notes to the author.\n\n",
    );
    p.push_str(
        "Return JSON with these fields:\n\
         - content: the post text\n\
         - hashtags: 3-5 relevant hashtags (no # prefix)\n\
         - suggested_time: best time to post (e.g. \"Tuesday 9 AM\")\n\
         - linkedin_tips: 2-3 LinkedIn-specific optimization tips\n",
    );

    p
}

fn build_user_prompt(topic: &str, source: SourceType, prefs: &DraftRequest) -> String {
    let mut p = String::with_capacity(512);

    match source {
        SourceType::Photo => {
            p.push_str("Create a LinkedIn post to accompany a photo. Photo context: ");
            p.push_str(topic);
            p.push('\n');
        }
        SourceType::Text => {
            p.push_str("Create a LinkedIn post about: ");
            p.push_str(topic);
            p.push('\n');
        }
    }

    p.push_str(&format!("\nIndustry: {}\n", prefs.industry));
    p.push_str(&format!("Tone: {}\n", prefs.tone));
    p.push_str(&format!(
        "Length: {} ({})\n",
        prefs.length,
        length_guideline(&prefs.length)
    ));

    p
}
