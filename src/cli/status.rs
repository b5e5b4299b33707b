// src/cli/status.rs — Configuration and storage diagnostics

use crate::infra::config::Config;
use crate::infra::paths;
use crate::store::Store;

pub fn show_status(config: &Config, user: Option<i64>) -> anyhow::Result<()> {
    println!("postwright v{}", env!("CARGO_PKG_VERSION"));
    println!();

    let token = config.telegram.resolve_token();
    println!(
        "  Telegram token:    {}",
        if token.is_some() { "set" } else { "MISSING (set TELEGRAM_BOT_TOKEN)" }
    );

    let gemini = std::env::var("GOOGLE_API_KEY").is_ok();
    println!(
        "  Generator:         {} ({})",
        config.models.generator,
        if gemini { "key set" } else { "GOOGLE_API_KEY missing" }
    );

    let linkedin = config.linkedin.resolve_client_id().is_some()
        && config.linkedin.resolve_client_secret().is_some();
    println!(
        "  LinkedIn connect:  {}",
        if linkedin { "configured" } else { "not configured" }
    );

    let db_path = paths::db_path();
    if !db_path.exists() {
        println!("  Database:          not initialized (created on first run)");
        return Ok(());
    }

    let store = match Store::open(&db_path) {
        Ok(store) => store,
        Err(e) => {
            println!("  Database:          unreadable ({e})");
            return Ok(());
        }
    };

    let drafts = store.count_posts("draft").unwrap_or(0);
    let size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
    println!("  Database:          {} draft(s), {}KB", drafts, size / 1024);

    if let Some(user_id) = user {
        println!();
        println!("Drafts for user {user_id}:");
        let posts = store.list_posts(user_id, "draft", 10)?;
        if posts.is_empty() {
            println!("  (none)");
        }
        for (id, content) in posts {
            println!("  {id}  {}", preview(&content, 72));
        }
    }

    Ok(())
}

/// First line of a post, truncated at a character boundary.
fn preview(content: &str, max: usize) -> String {
    let line = content.lines().next().unwrap_or("");
    if line.chars().count() <= max {
        return line.to_string();
    }
    let cut: String = line.chars().take(max).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_keeps_short_lines() {
        assert_eq!(preview("Short post body", 72), "Short post body");
    }

    #[test]
    fn test_preview_truncates_long_lines() {
        let long = "x".repeat(100);
        let p = preview(&long, 72);
        assert_eq!(p.chars().count(), 73);
        assert!(p.ends_with('…'));
    }

    #[test]
    fn test_preview_uses_first_line_only() {
        assert_eq!(preview("first\nsecond", 72), "first");
    }
}
