// src/cli/init.rs — Write a starter config

use crate::infra::config::Config;
use crate::infra::paths;

pub fn run_init() -> anyhow::Result<()> {
    let path = paths::config_path();
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, Config::default().to_toml()?)?;

    println!("Wrote {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. export TELEGRAM_BOT_TOKEN=...   (from @BotFather)");
    println!("  2. export GOOGLE_API_KEY=...       (Gemini API key)");
    println!("  3. Optionally set [linkedin] client_id/client_secret for connect greetings");
    println!("  4. postwright run");
    Ok(())
}
