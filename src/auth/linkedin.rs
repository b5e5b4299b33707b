// src/auth/linkedin.rs — LinkedIn OIDC handshake
//
// Authorization URL building, code-for-token exchange, and userinfo fetch.
// Connections are stored in SQLite with a 60-day expiry (LinkedIn's token
// lifetime); the core consults connection status only to decide greeting.

use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::infra::errors::PostwrightError;
use crate::store::{LinkedInConnection, StoreHandle};

const AUTH_URL: &str = "https://www.linkedin.com/oauth/v2/authorization";
const TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
const USERINFO_URL: &str = "https://api.linkedin.com/v2/userinfo";

/// LinkedIn tokens expire in 60 days.
const TOKEN_LIFETIME_DAYS: i64 = 60;

pub struct LinkedInAuth {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// The subset of the userinfo payload the greeting logic cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserProfile {
    /// Best available display name: `name`, else given + family.
    pub fn display_name(&self) -> Option<String> {
        if let Some(ref n) = self.name {
            if !n.trim().is_empty() {
                return Some(n.trim().to_string());
            }
        }
        let joined = [self.given_name.as_deref(), self.family_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let joined = joined.trim().to_string();
        (!joined.is_empty()).then_some(joined)
    }
}

impl LinkedInAuth {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            client: Client::new(),
        }
    }

    /// OIDC authorization URL for one user's connect flow.
    pub fn auth_url(&self, state: &str) -> String {
        let url = Url::parse_with_params(
            AUTH_URL,
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("state", state),
                ("scope", "openid profile email"),
            ],
        )
        .expect("static auth URL is valid");
        url.to_string()
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, PostwrightError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&form)
            .send()
            .await
            .map_err(|e| PostwrightError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PostwrightError::Auth(format!("Token exchange failed: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| PostwrightError::Auth(format!("Bad token response: {e}")))
    }

    /// Fetch the user's profile from the OIDC userinfo endpoint.
    pub async fn fetch_userinfo(
        &self,
        access_token: &str,
    ) -> Result<serde_json::Value, PostwrightError> {
        let response = self
            .client
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| PostwrightError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PostwrightError::Auth(format!("Profile fetch failed: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| PostwrightError::Auth(format!("Bad userinfo response: {e}")))
    }

    /// Build the connection record stored after a successful exchange.
    pub fn build_connection(
        user_id: i64,
        tokens: TokenResponse,
        profile: serde_json::Value,
    ) -> LinkedInConnection {
        let now = Utc::now();
        LinkedInConnection {
            user_id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            id_token: tokens.id_token,
            profile: Some(profile),
            connected_at: now,
            expires_at: now + Duration::days(TOKEN_LIFETIME_DAYS),
        }
    }

    /// Whether the user has an unexpired LinkedIn connection.
    pub fn is_connected(&self, store: &StoreHandle, user_id: i64) -> bool {
        let Ok(s) = store.lock() else { return false };
        match s.get_connection(user_id) {
            Ok(Some(conn)) => conn.expires_at > Utc::now(),
            _ => false,
        }
    }

    /// Parsed profile for an existing connection.
    pub fn profile(&self, store: &StoreHandle, user_id: i64) -> Option<UserProfile> {
        let s = store.lock().ok()?;
        let conn = s.get_connection(user_id).ok()??;
        serde_json::from_value(conn.profile?).ok()
    }
}

// ─── OAuth state nonce ──────────────────────────────────────────────────────

const STATE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Random URL-safe nonce from the OS CSPRNG, with rejection sampling to
/// avoid modular bias.
fn random_nonce(len: usize) -> String {
    // Largest multiple of the charset size that fits in a u8.
    let reject_threshold: u8 = (256 - (256 % STATE_CHARSET.len() as u16)) as u8;

    let mut result = String::with_capacity(len);
    let mut buf = vec![0u8; len * 2];
    while result.len() < len {
        getrandom::getrandom(&mut buf)
            .expect("getrandom failed: OS CSPRNG unavailable");
        for &b in &buf {
            if result.len() >= len {
                break;
            }
            if b < reject_threshold {
                result.push(STATE_CHARSET[(b as usize) % STATE_CHARSET.len()] as char);
            }
        }
    }
    result
}

/// State parameter carried through the OAuth round-trip: identifies the
/// chat user and defeats CSRF with a random suffix.
pub fn new_state(user_id: i64) -> String {
    format!("user_{}_{}", user_id, random_nonce(24))
}

/// Recover the chat user id from a callback state parameter.
pub fn user_id_from_state(state: &str) -> Option<i64> {
    let rest = state.strip_prefix("user_")?;
    let (id, _nonce) = rest.split_once('_')?;
    id.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_url_carries_oidc_params() {
        let auth = LinkedInAuth::new(
            "client-1".into(),
            "secret".into(),
            "http://localhost:8000/auth/linkedin/callback".into(),
        );
        let url = auth.auth_url("user_42_abc");
        assert!(url.starts_with("https://www.linkedin.com/oauth/v2/authorization?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("state=user_42_abc"));
        assert!(url.contains("scope=openid+profile+email"));
        // The secret never appears in the browser URL
        assert!(!url.contains("secret"));
    }

    #[test]
    fn test_state_roundtrip() {
        let state = new_state(12345);
        assert_eq!(user_id_from_state(&state), Some(12345));
    }

    #[test]
    fn test_state_nonces_differ() {
        assert_ne!(new_state(1), new_state(1));
    }

    #[test]
    fn test_user_id_from_malformed_state() {
        assert!(user_id_from_state("garbage").is_none());
        assert!(user_id_from_state("user_").is_none());
        assert!(user_id_from_state("user_nope_x").is_none());
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        let p = UserProfile {
            name: Some("Ada Lovelace".into()),
            given_name: Some("Ada".into()),
            family_name: Some("L".into()),
            email: None,
        };
        assert_eq!(p.display_name().as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn test_display_name_builds_from_parts() {
        let p = UserProfile {
            name: None,
            given_name: Some("Ada".into()),
            family_name: Some("Lovelace".into()),
            email: None,
        };
        assert_eq!(p.display_name().as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn test_display_name_none_when_empty() {
        let p = UserProfile {
            name: None,
            given_name: None,
            family_name: None,
            email: None,
        };
        assert!(p.display_name().is_none());
    }

    #[test]
    fn test_build_connection_sets_expiry() {
        let conn = LinkedInAuth::build_connection(
            7,
            TokenResponse {
                access_token: "tok".into(),
                refresh_token: None,
                id_token: None,
            },
            serde_json::json!({"name": "Ada"}),
        );
        let days = (conn.expires_at - conn.connected_at).num_days();
        assert_eq!(days, 60);
    }
}
