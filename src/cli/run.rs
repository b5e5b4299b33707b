// src/cli/run.rs — The bot loop: poll Telegram, greet, orchestrate, reply

use std::sync::Arc;

use chrono::{Local, Timelike};

use crate::api::{self, ApiState};
use crate::auth::linkedin::{self, LinkedInAuth};
use crate::core::orchestrator::Orchestrator;
use crate::core::types::EngineConfig;
use crate::infra::config::Config;
use crate::infra::paths;
use crate::integrations::telegram::{self, TelegramAdapter, TgMessage};
use crate::provider;
use crate::store::{Store, StoreHandle};

const PHOTO_CAPTION_PROMPT: &str = "Got the photo! Please add a caption describing \
the event or key details, and I'll craft a post.";

/// Everything a message handler task needs, cheap to clone.
#[derive(Clone)]
struct BotContext {
    adapter: Arc<TelegramAdapter>,
    orchestrator: Arc<Orchestrator>,
    store: Option<StoreHandle>,
    auth: Option<Arc<LinkedInAuth>>,
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let token = config
        .telegram
        .resolve_token()
        .ok_or_else(|| anyhow::anyhow!("No Telegram token. Set TELEGRAM_BOT_TOKEN or [telegram].bot_token."))?;

    let (provider, model_ref) = provider::resolve(&config)?;
    tracing::info!("Generator: {model_ref}");

    let store = init_store();
    let auth = build_auth(&config);

    let orchestrator = Arc::new(Orchestrator::new(
        provider,
        &model_ref,
        EngineConfig::from(&config.generation),
        config.classifier.clone(),
        store.clone(),
    ));

    // Callback server only makes sense with both auth and storage.
    if let (Some(auth), Some(store)) = (auth.clone(), store.clone()) {
        let port = config.linkedin.callback_port;
        let state = ApiState { auth, store };
        tokio::spawn(async move {
            if let Err(e) = api::start_server(port, state).await {
                tracing::error!("Callback server failed: {e}");
            }
        });
    }

    let adapter = Arc::new(TelegramAdapter::new(token));
    match adapter.validate().await {
        Ok(who) => tracing::info!("Telegram: {who}"),
        Err(e) => tracing::warn!("Telegram getMe failed (continuing): {e}"),
    }

    let ctx = BotContext {
        adapter: adapter.clone(),
        orchestrator,
        store,
        auth,
    };

    tracing::info!("Postwright is polling for messages");
    let mut offset = 0i64;
    loop {
        match adapter.get_updates(offset, config.telegram.poll_timeout_secs).await {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let Some(message) = update.message else { continue };
                    let ctx = ctx.clone();
                    // Per-user ordering comes from the session lock inside
                    // the orchestrator; spawning keeps users independent.
                    tokio::spawn(async move {
                        handle_message(ctx, message).await;
                    });
                }
            }
            Err(e) => {
                tracing::warn!("getUpdates failed, backing off: {e}");
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            }
        }
    }
}

async fn handle_message(ctx: BotContext, message: TgMessage) {
    let chat_id = message.chat.id;

    let Some(from) = message.from.as_ref() else {
        return;
    };
    let user_id = from.id;

    if let Some(ref store) = ctx.store {
        if let Ok(s) = store.lock() {
            let _ = s.upsert_user(
                user_id,
                from.username.as_deref(),
                from.first_name.as_deref(),
                from.last_name.as_deref(),
            );
        }
    }

    // One-time greeting after a LinkedIn connect completes.
    maybe_send_connect_greeting(&ctx, user_id, from.first_name.as_deref()).await;

    // Connect request: transport-level, no generation involved.
    let body = message
        .caption
        .as_deref()
        .or(message.text.as_deref())
        .unwrap_or("")
        .trim()
        .to_lowercase();
    if body == "/connect" || body == "connect linkedin" {
        let reply = connect_reply(&ctx, user_id);
        send(&ctx, chat_id, &reply).await;
        return;
    }

    let Some(event) = telegram::normalize(&message) else {
        // A photo without a caption is the only normalizable miss worth
        // answering.
        if message.photo.as_ref().is_some_and(|p| !p.is_empty()) {
            send(&ctx, chat_id, PHOTO_CAPTION_PROMPT).await;
        }
        return;
    };

    let outcome = ctx.orchestrator.handle(event).await;
    tracing::debug!(
        user_id,
        intent = outcome.intent,
        persisted = outcome.persisted,
        "Turn finished"
    );
    send(&ctx, chat_id, &outcome.reply.text).await;
}

async fn send(ctx: &BotContext, chat_id: i64, text: &str) {
    if let Err(e) = ctx.adapter.send_message(chat_id, text).await {
        tracing::warn!(chat_id, "sendMessage failed: {e}");
    }
}

/// Greet once after the user's LinkedIn connection appears, then remember
/// that we did.
async fn maybe_send_connect_greeting(ctx: &BotContext, user_id: i64, first_name: Option<&str>) {
    let (Some(auth), Some(store)) = (&ctx.auth, &ctx.store) else {
        return;
    };
    if !auth.is_connected(store, user_id) {
        return;
    }

    let already_welcomed = store
        .lock()
        .ok()
        .and_then(|s| s.get_user(user_id).ok().flatten())
        .map(|u| u.welcomed_after_connect)
        .unwrap_or(false);
    if already_welcomed {
        return;
    }

    // Prefer the LinkedIn profile name; the chat-level first name is the
    // fallback.
    let name = auth
        .profile(store, user_id)
        .and_then(|p| p.display_name())
        .or_else(|| first_name.map(String::from))
        .unwrap_or_else(|| "there".into());
    let greeting = telegram::time_greeting(Local::now().hour());
    let text = format!(
        "{greeting}, {name}! You're connected to LinkedIn. Tell me what you need \
         and I'll craft a LinkedIn-ready post for you.\n\n\
         Examples:\n\
         - 'Create a post about yesterday's AI meetup'\n\
         - 'Turn this into a post: launched our new feature today'\n\
         - 'Make a short post with a friendly tone'\n\n\
         Reply 'regenerate' anytime to get another version."
    );
    send(ctx, user_id, &text).await;

    if let Ok(s) = store.lock() {
        let _ = s.mark_welcomed(user_id);
    }

    // Reflect the connection on the session for the engine's benefit.
    let mut session = ctx.orchestrator.sessions().acquire(user_id).await;
    session.connected = true;
    session.greeted_at = Some(chrono::Utc::now());
    ctx.orchestrator.sessions().persist(&session);
}

fn connect_reply(ctx: &BotContext, user_id: i64) -> String {
    match &ctx.auth {
        Some(auth) => {
            let url = auth.auth_url(&linkedin::new_state(user_id));
            format!("Open this link to connect your LinkedIn account:\n{url}")
        }
        None => "LinkedIn connect isn't configured on this bot.".into(),
    }
}

fn build_auth(config: &Config) -> Option<Arc<LinkedInAuth>> {
    let client_id = config.linkedin.resolve_client_id()?;
    let client_secret = config.linkedin.resolve_client_secret()?;
    Some(Arc::new(LinkedInAuth::new(
        client_id,
        client_secret,
        config.linkedin.redirect_uri.clone(),
    )))
}

/// Open the SQLite store, running migrations. Non-fatal: without it the bot
/// still drafts, it just can't persist or greet.
fn init_store() -> Option<StoreHandle> {
    match Store::open(&paths::db_path()) {
        Ok(store) => Some(Arc::new(std::sync::Mutex::new(store))),
        Err(e) => {
            tracing::warn!("Could not open database: {e}. Drafts will not be persisted.");
            None
        }
    }
}
