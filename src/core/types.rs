// src/core/types.rs — Core domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Normalized inbound message event, produced by the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub user_id: i64,
    pub text: Option<String>,
    pub photo_caption: Option<String>,
    pub first_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl InboundEvent {
    pub fn text_message(user_id: i64, text: impl Into<String>) -> Self {
        Self {
            user_id,
            text: Some(text.into()),
            photo_caption: None,
            first_name: None,
            timestamp: Utc::now(),
        }
    }

    pub fn photo_message(user_id: i64, caption: impl Into<String>) -> Self {
        Self {
            user_id,
            text: None,
            photo_caption: Some(caption.into()),
            first_name: None,
            timestamp: Utc::now(),
        }
    }

    /// The message body used for classification: photo caption wins when present.
    pub fn body(&self) -> &str {
        self.photo_caption
            .as_deref()
            .or(self.text.as_deref())
            .unwrap_or("")
    }
}

/// What the core hands back to the transport for delivery.
#[derive(Debug, Clone)]
pub struct TurnReply {
    pub text: String,
    pub is_draft: bool,
}

/// Where a draft's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Text,
    Photo,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Text => write!(f, "text"),
            SourceType::Photo => write!(f, "photo"),
        }
    }
}

/// Lifecycle status of a stored post. The core only ever writes `Draft`;
/// publishing happens outside this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Draft,
    Published,
}

impl std::fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DraftStatus::Draft => write!(f, "draft"),
            DraftStatus::Published => write!(f, "published"),
        }
    }
}

/// The current working post text plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub text: String,
    pub source: SourceType,
    /// The topic or caption the draft was originally generated from.
    /// "regenerate" reuses this verbatim, so it must not drift.
    pub origin_prompt: String,
    pub created_at: DateTime<Utc>,
    pub status: DraftStatus,
}

impl Draft {
    pub fn new(text: impl Into<String>, source: SourceType, origin: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source,
            origin_prompt: origin.into(),
            created_at: Utc::now(),
            status: DraftStatus::Draft,
        }
    }
}

// ─── Refinement cues ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthCue {
    Shorter,
    Longer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneCue {
    Casual,
    Professional,
    Enthusiastic,
    Thoughtful,
}

impl ToneCue {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToneCue::Casual => "casual",
            ToneCue::Professional => "professional",
            ToneCue::Enthusiastic => "enthusiastic",
            ToneCue::Thoughtful => "thoughtful",
        }
    }
}

/// The parsed refinement instructions extracted from one follow-up message.
/// Chained cues ("shorter, more casual") land in a single set and are
/// applied together in one rewrite, never sequentially.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CueSet {
    pub length: Option<LengthCue>,
    pub tone: Option<ToneCue>,
    pub perspective: Option<String>,
    /// Instructions that matched no known category.
    pub freeform: Vec<String>,
}

impl CueSet {
    pub fn is_empty(&self) -> bool {
        self.length.is_none()
            && self.tone.is_none()
            && self.perspective.is_none()
            && self.freeform.is_empty()
    }

    /// Number of populated cue categories.
    pub fn category_count(&self) -> usize {
        self.length.is_some() as usize
            + self.tone.is_some() as usize
            + self.perspective.is_some() as usize
            + (!self.freeform.is_empty()) as usize
    }

    /// Human-readable rendering used in refinement prompts.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(len) = self.length {
            parts.push(match len {
                LengthCue::Shorter => "make it noticeably shorter".to_string(),
                LengthCue::Longer => "make it longer and more detailed".to_string(),
            });
        }
        if let Some(tone) = self.tone {
            parts.push(format!("shift the tone to {}", tone.as_str()));
        }
        if let Some(ref p) = self.perspective {
            parts.push(format!("write it from a {p} perspective"));
        }
        for f in &self.freeform {
            parts.push(f.clone());
        }
        parts.join("; ")
    }
}

// ─── Intent ─────────────────────────────────────────────────────────────────

/// Per-message intent. Derived by the classifier, consumed once by the
/// orchestrator's dispatch match, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Create {
        topic: String,
        source: SourceType,
        /// True when this Create reuses the current draft's originating
        /// prompt (the "regenerate" path).
        regenerate: bool,
    },
    Refine {
        cues: CueSet,
    },
    Optimize {
        instruction: String,
    },
    Tips {
        question: String,
    },
    Ambiguous {
        topic: String,
    },
}

impl Intent {
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::Create { .. } => "create",
            Intent::Refine { .. } => "refine",
            Intent::Optimize { .. } => "optimize",
            Intent::Tips { .. } => "tips",
            Intent::Ambiguous { .. } => "ambiguous",
        }
    }
}

// ─── Generation output ──────────────────────────────────────────────────────

/// Structured output parsed from a generation call. When the model ignores
/// the JSON instruction, `content` carries the raw text and the rest stays
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPost {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub suggested_time: Option<String>,
    #[serde(default)]
    pub linkedin_tips: Vec<String>,
}

/// Record of one generation call, returned by workers for audit.
#[derive(Debug, Clone)]
pub struct PromptTrace {
    pub worker: &'static str,
    pub model: String,
    pub prompt: String,
}

// ─── Drafting preferences ───────────────────────────────────────────────────

/// Per-user drafting preferences carried across turns. Refinement cues
/// update tone and length for subsequent generations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRequest {
    pub topic: String,
    pub industry: String,
    pub tone: String,
    pub length: String,
}

impl Default for DraftRequest {
    fn default() -> Self {
        Self {
            topic: String::new(),
            industry: "general".into(),
            tone: "professional".into(),
            length: "medium".into(),
        }
    }
}

impl DraftRequest {
    /// Fold a cue set into the standing preferences.
    pub fn apply_cues(&mut self, cues: &CueSet) {
        if let Some(len) = cues.length {
            self.length = match len {
                LengthCue::Shorter => "short".into(),
                LengthCue::Longer => "long".into(),
            };
        }
        if let Some(tone) = cues.tone {
            self.tone = tone.as_str().into();
        }
    }
}

// ─── Persistence request ────────────────────────────────────────────────────

/// Write request issued to the persistence collaborator, exactly once per
/// successful Create/Refine turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub user_id: i64,
    pub content: String,
    pub source_type: SourceType,
    pub status: DraftStatus,
    pub topic: String,
    pub industry: String,
    pub tone: String,
    pub hashtags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// ─── Turn machinery ─────────────────────────────────────────────────────────

/// Lifecycle phases of one orchestration turn. Transitions are strictly
/// sequential; `Failed` replaces everything after `Dispatched` when
/// generation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Received,
    Classified,
    StateLoaded,
    Dispatched,
    GenerationComplete,
    Persisted,
    Replied,
    Failed,
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TurnPhase::Received => "received",
            TurnPhase::Classified => "classified",
            TurnPhase::StateLoaded => "state_loaded",
            TurnPhase::Dispatched => "dispatched",
            TurnPhase::GenerationComplete => "generation_complete",
            TurnPhase::Persisted => "persisted",
            TurnPhase::Replied => "replied",
            TurnPhase::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Everything the orchestrator reports back for one turn.
#[derive(Debug)]
pub struct TurnOutcome {
    pub reply: TurnReply,
    pub intent: &'static str,
    pub phases: Vec<TurnPhase>,
    pub traces: Vec<PromptTrace>,
    /// True when a persistence write committed this turn.
    pub persisted: bool,
}

/// Engine knobs, derived from the `[generation]` config section.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub generation_timeout: Duration,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub optimize_pass: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&crate::infra::config::GenerationConfig::default())
    }
}

impl From<&crate::infra::config::GenerationConfig> for EngineConfig {
    fn from(cfg: &crate::infra::config::GenerationConfig) -> Self {
        Self {
            generation_timeout: Duration::from_secs(cfg.timeout_seconds),
            temperature: cfg.temperature,
            max_output_tokens: cfg.max_output_tokens,
            optimize_pass: cfg.optimize_pass,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── InboundEvent ───────────────────────────────────────────

    #[test]
    fn test_body_prefers_photo_caption() {
        let mut ev = InboundEvent::text_message(1, "hello");
        ev.photo_caption = Some("launch day".into());
        assert_eq!(ev.body(), "launch day");
    }

    #[test]
    fn test_body_empty_when_nothing_set() {
        let ev = InboundEvent {
            user_id: 1,
            text: None,
            photo_caption: None,
            first_name: None,
            timestamp: Utc::now(),
        };
        assert_eq!(ev.body(), "");
    }

    // ─── CueSet ─────────────────────────────────────────────────

    #[test]
    fn test_cue_set_empty() {
        assert!(CueSet::default().is_empty());
        assert_eq!(CueSet::default().category_count(), 0);
    }

    #[test]
    fn test_cue_set_category_count() {
        let cues = CueSet {
            length: Some(LengthCue::Shorter),
            tone: Some(ToneCue::Casual),
            perspective: None,
            freeform: vec![],
        };
        assert_eq!(cues.category_count(), 2);
        assert!(!cues.is_empty());
    }

    #[test]
    fn test_cue_set_describe_mentions_all_categories() {
        let cues = CueSet {
            length: Some(LengthCue::Shorter),
            tone: Some(ToneCue::Casual),
            perspective: Some("student".into()),
            freeform: vec!["mention the meetup venue".into()],
        };
        let d = cues.describe();
        assert!(d.contains("shorter"));
        assert!(d.contains("casual"));
        assert!(d.contains("student perspective"));
        assert!(d.contains("meetup venue"));
    }

    // ─── DraftRequest ───────────────────────────────────────────

    #[test]
    fn test_apply_cues_updates_prefs() {
        let mut prefs = DraftRequest::default();
        prefs.apply_cues(&CueSet {
            length: Some(LengthCue::Shorter),
            tone: Some(ToneCue::Casual),
            ..Default::default()
        });
        assert_eq!(prefs.length, "short");
        assert_eq!(prefs.tone, "casual");
        // Untouched fields keep their defaults
        assert_eq!(prefs.industry, "general");
    }

    #[test]
    fn test_apply_empty_cues_is_noop() {
        let mut prefs = DraftRequest::default();
        prefs.apply_cues(&CueSet::default());
        assert_eq!(prefs, DraftRequest::default());
    }

    // ─── Intent ─────────────────────────────────────────────────

    #[test]
    fn test_intent_kind() {
        let i = Intent::Create {
            topic: "t".into(),
            source: SourceType::Text,
            regenerate: false,
        };
        assert_eq!(i.kind(), "create");
        assert_eq!(Intent::Refine { cues: CueSet::default() }.kind(), "refine");
    }

    // ─── GeneratedPost ──────────────────────────────────────────

    #[test]
    fn test_generated_post_partial_json() {
        let p: GeneratedPost =
            serde_json::from_str(r#"{"content": "Hello world"}"#).unwrap();
        assert_eq!(p.content, "Hello world");
        assert!(p.hashtags.is_empty());
        assert!(p.suggested_time.is_none());
    }

    // ─── Display impls ──────────────────────────────────────────

    #[test]
    fn test_source_type_display() {
        assert_eq!(SourceType::Text.to_string(), "text");
        assert_eq!(SourceType::Photo.to_string(), "photo");
    }

    #[test]
    fn test_draft_status_display() {
        assert_eq!(DraftStatus::Draft.to_string(), "draft");
    }

    #[test]
    fn test_turn_phase_display() {
        assert_eq!(TurnPhase::GenerationComplete.to_string(), "generation_complete");
    }
}
