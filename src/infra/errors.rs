// src/infra/errors.rs — Error types for Postwright

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PostwrightError {
    // Provider errors (retriable)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    // Generation failures (surfaced to the user as a retry invitation,
    // never as raw detail)
    #[error("Generation timed out after {limit_secs}s")]
    GenerationTimeout { limit_secs: u64 },

    #[error("Generation returned empty output for '{worker}'")]
    EmptyGeneration { worker: String },

    // User errors
    #[error("No provider configured. Run `postwright init` or set GOOGLE_API_KEY.")]
    NoProvider,

    #[error("Telegram error: {0}")]
    Telegram(String),

    #[error("LinkedIn auth error: {0}")]
    Auth(String),

    // Infra
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PostwrightError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            PostwrightError::Provider {
                retriable: true,
                ..
            } | PostwrightError::RateLimited { .. }
        )
    }

    /// True for any failure mode of the generation capability. The
    /// orchestrator uses this to decide that the turn failed without
    /// touching the session's current draft.
    pub fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            PostwrightError::Provider { .. }
                | PostwrightError::RateLimited { .. }
                | PostwrightError::GenerationTimeout { .. }
                | PostwrightError::EmptyGeneration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_provider_error() {
        let err = PostwrightError::Provider {
            provider: "google".into(),
            message: "HTTP 503".into(),
            retriable: true,
        };
        assert!(err.is_retriable());
        assert!(err.is_generation_failure());
    }

    #[test]
    fn test_timeout_is_generation_failure_but_not_retriable() {
        let err = PostwrightError::GenerationTimeout { limit_secs: 45 };
        assert!(!err.is_retriable());
        assert!(err.is_generation_failure());
    }

    #[test]
    fn test_config_error_is_not_generation_failure() {
        let err = PostwrightError::Config("bad toml".into());
        assert!(!err.is_retriable());
        assert!(!err.is_generation_failure());
    }
}
