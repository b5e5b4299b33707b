// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub linkedin: LinkedInConfig,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token. Falls back to the TELEGRAM_BOT_TOKEN environment variable.
    pub bot_token: Option<String>,
    /// Long-poll timeout passed to getUpdates.
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            poll_timeout_secs: 30,
        }
    }
}

impl TelegramConfig {
    pub fn resolve_token(&self) -> Option<String> {
        self.bot_token
            .clone()
            .or_else(|| std::env::var("TELEGRAM_BOT_TOKEN").ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedInConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    /// Port for the local OAuth callback endpoint.
    pub callback_port: u16,
}

impl Default for LinkedInConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: "http://localhost:8000/auth/linkedin/callback".into(),
            callback_port: 8000,
        }
    }
}

impl LinkedInConfig {
    pub fn resolve_client_id(&self) -> Option<String> {
        self.client_id
            .clone()
            .or_else(|| std::env::var("LINKEDIN_CLIENT_ID").ok())
    }

    pub fn resolve_client_secret(&self) -> Option<String> {
        self.client_secret
            .clone()
            .or_else(|| std::env::var("LINKEDIN_CLIENT_SECRET").ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Generator model in "provider/model" form.
    pub generator: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            generator: "google/gemini-2.5-flash".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Bound on a single generation call; exceeding it fails the turn.
    pub timeout_seconds: u64,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Run the optimize pass after every create.
    pub optimize_pass: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 45,
            temperature: 0.7,
            max_output_tokens: 1024,
            optimize_pass: true,
        }
    }
}

/// Keyword tables driving intent classification and cue extraction.
/// Defaults cover the vocabulary the bot advertises to users; deployments
/// can extend or replace any table in config.toml without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub regenerate_keywords: Vec<String>,
    pub tips_keywords: Vec<String>,
    pub optimize_keywords: Vec<String>,
    /// Bare refinement verbs that signal a rewrite request without naming
    /// a concrete cue ("refine", "rewrite", ...).
    pub refine_markers: Vec<String>,
    pub shorter_keywords: Vec<String>,
    pub longer_keywords: Vec<String>,
    pub casual_keywords: Vec<String>,
    pub professional_keywords: Vec<String>,
    pub enthusiastic_keywords: Vec<String>,
    pub thoughtful_keywords: Vec<String>,
    /// Phrases that introduce a perspective cue, e.g. "from a student
    /// perspective" or "as a recruiter".
    pub perspective_markers: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            regenerate_keywords: vec![
                "regenerate".into(),
                "recreate".into(),
                "another version".into(),
                "try again".into(),
            ],
            tips_keywords: vec![
                "tips".into(),
                "advice".into(),
                "best time to post".into(),
                "what's the best".into(),
                "whats the best".into(),
                "how do i".into(),
                "how should i".into(),
                "should i".into(),
                "strategy".into(),
            ],
            optimize_keywords: vec![
                "optimize".into(),
                "polish".into(),
                "tighten".into(),
                "clean it up".into(),
                "improve the structure".into(),
            ],
            refine_markers: vec![
                "refine".into(),
                "rewrite".into(),
                "rephrase".into(),
                "adjust".into(),
                "redo".into(),
                "change tone".into(),
                "change the tone".into(),
                "make it".into(),
            ],
            shorter_keywords: vec!["shorter".into(), "more concise".into(), "trim it".into()],
            longer_keywords: vec!["longer".into(), "expand".into(), "more detail".into()],
            casual_keywords: vec!["casual".into(), "friendly".into(), "conversational".into()],
            professional_keywords: vec!["professional".into(), "formal".into()],
            enthusiastic_keywords: vec![
                "enthusiastic".into(),
                "energetic".into(),
                "excited".into(),
            ],
            thoughtful_keywords: vec!["thoughtful".into(), "reflective".into()],
            perspective_markers: vec!["from a".into(), "from the".into(), "as a".into()],
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults when no
    /// config.toml exists yet.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid config at {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Serialize the current config (used by `postwright init`).
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.generation.timeout_seconds, 45);
        assert!(cfg.generation.optimize_pass);
        assert_eq!(cfg.models.generator, "google/gemini-2.5-flash");
        assert_eq!(cfg.telegram.poll_timeout_secs, 30);
        assert!(cfg
            .classifier
            .regenerate_keywords
            .contains(&"regenerate".to_string()));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [generation]
            timeout_seconds = 10
            temperature = 0.2
            max_output_tokens = 512
            optimize_pass = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.generation.timeout_seconds, 10);
        assert!(!cfg.generation.optimize_pass);
        // Untouched sections keep their defaults
        assert_eq!(cfg.telegram.poll_timeout_secs, 30);
        assert!(!cfg.classifier.tips_keywords.is_empty());
    }

    #[test]
    fn test_classifier_tables_overridable() {
        let cfg: Config = toml::from_str(
            r#"
            [classifier]
            regenerate_keywords = ["noch mal"]
            tips_keywords = ["rat"]
            optimize_keywords = []
            refine_markers = []
            shorter_keywords = ["kuerzer"]
            longer_keywords = []
            casual_keywords = []
            professional_keywords = []
            enthusiastic_keywords = []
            thoughtful_keywords = []
            perspective_markers = []
            "#,
        )
        .unwrap();
        assert_eq!(cfg.classifier.regenerate_keywords, vec!["noch mal"]);
        assert_eq!(cfg.classifier.shorter_keywords, vec!["kuerzer"]);
    }

    #[test]
    fn test_roundtrip() {
        let cfg = Config::default();
        let toml = cfg.to_toml().unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.models.generator, cfg.models.generator);
    }
}
