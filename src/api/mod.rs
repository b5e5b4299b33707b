// src/api/mod.rs — OAuth callback endpoint
//
// A tiny axum server that completes the LinkedIn connect flow: the browser
// lands on /auth/linkedin/callback with code+state, we exchange the code,
// fetch userinfo, and store the connection keyed by the chat user id
// recovered from the state parameter.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::auth::linkedin::{self, LinkedInAuth};
use crate::store::StoreHandle;

/// Shared state for callback handlers.
#[derive(Clone)]
pub struct ApiState {
    pub auth: Arc<LinkedInAuth>,
    pub store: StoreHandle,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Build the axum router with all callback routes.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/auth/linkedin/callback", get(linkedin_callback))
        .route("/healthz", get(health))
        .with_state(state)
}

/// Start the callback server on the given port (blocking).
pub async fn start_server(port: u16, state: ApiState) -> anyhow::Result<()> {
    let addr = format!("127.0.0.1:{port}");
    let router = build_router(state);

    tracing::info!("Callback server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn linkedin_callback(
    State(state): State<ApiState>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, Html<String>) {
    if let Some(error) = params.error {
        let detail = params.error_description.unwrap_or_default();
        tracing::warn!("LinkedIn callback error: {error} {detail}");
        return page(
            StatusCode::BAD_REQUEST,
            "Connection failed",
            "LinkedIn declined the authorization. You can close this tab and try again from the chat.",
        );
    }

    let (Some(code), Some(oauth_state)) = (params.code, params.state) else {
        return page(
            StatusCode::BAD_REQUEST,
            "Connection failed",
            "Missing code or state parameter.",
        );
    };

    let Some(user_id) = linkedin::user_id_from_state(&oauth_state) else {
        return page(
            StatusCode::BAD_REQUEST,
            "Connection failed",
            "Unrecognized state parameter.",
        );
    };

    let tokens = match state.auth.exchange_code(&code).await {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(user_id, "Token exchange failed: {e}");
            return page(
                StatusCode::BAD_GATEWAY,
                "Connection failed",
                "Could not complete the token exchange. Please try again from the chat.",
            );
        }
    };

    let profile = match state.auth.fetch_userinfo(&tokens.access_token).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(user_id, "Userinfo fetch failed: {e}");
            serde_json::json!({})
        }
    };

    let connection = LinkedInAuth::build_connection(user_id, tokens, profile);
    let saved = state
        .store
        .lock()
        .ok()
        .map(|s| s.save_connection(&connection));

    match saved {
        Some(Ok(())) => {
            tracing::info!(user_id, "LinkedIn connection stored");
            page(
                StatusCode::OK,
                "Connected",
                "Your LinkedIn account is connected. Head back to the chat to start drafting posts.",
            )
        }
        _ => page(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Connection failed",
            "The connection could not be saved. Please try again.",
        ),
    }
}

fn page(status: StatusCode, title: &str, body: &str) -> (StatusCode, Html<String>) {
    (
        status,
        Html(format!(
            "<!doctype html><html><head><title>{title}</title></head>\
             <body style=\"font-family: sans-serif; margin: 4em auto; max-width: 30em\">\
             <h2>{title}</h2><p>{body}</p></body></html>"
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_params_deserialize() {
        let params: CallbackParams =
            serde_json::from_str(r#"{"code": "abc", "state": "user_1_x"}"#).unwrap();
        assert_eq!(params.code.as_deref(), Some("abc"));
        assert!(params.error.is_none());
    }

    #[test]
    fn test_page_embeds_title_and_body() {
        let (status, Html(html)) = page(StatusCode::OK, "Connected", "All set.");
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<h2>Connected</h2>"));
        assert!(html.contains("All set."));
    }
}
