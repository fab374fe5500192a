mod config;
mod dialogue;
mod handlers;
mod keyboards;
mod state;
mod telegram;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use config::BotConfig;
use state::AppContext;
use telegram::TelegramClient;

const POLL_TIMEOUT_SECS: u64 = 30;

/// Load environment variables from a .env file (KEY=VALUE lines).
fn load_dotenv() {
    let manifest_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let candidates = [
        // Workspace root — two levels up from crates/reverie-bot/
        manifest_dir.join("..").join("..").join(".env"),
        // Current directory
        std::path::PathBuf::from(".env"),
    ];

    for path in &candidates {
        if let Ok(contents) = std::fs::read_to_string(path) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim().trim_matches('"').trim_matches('\'');
                    if std::env::var(key).is_err() {
                        std::env::set_var(key, value);
                    }
                }
            }
            return;
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Reverie v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Config load failed: {err}");
            std::process::exit(1);
        }
    };

    let store = match reverie_store::SqliteStore::open(&config.db_path) {
        Ok(store) => store,
        Err(err) => {
            tracing::error!("Store open failed: {err}");
            std::process::exit(1);
        }
    };
    tracing::info!(path = %config.db_path.display(), "Store ready");

    let ctx = Arc::new(AppContext {
        telegram: TelegramClient::new(config.telegram_token),
        store,
        dialogues: dialogue::Dialogues::new(),
    });

    tracing::info!("Entering poll loop");
    run(ctx).await;
}

/// Long-poll loop: each update is dispatched on its own task so one slow
/// model call never stalls other users.
async fn run(ctx: Arc<AppContext>) {
    let mut offset = 0;
    loop {
        match ctx.telegram.get_updates(offset, POLL_TIMEOUT_SECS).await {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let ctx = Arc::clone(&ctx);
                    tokio::spawn(async move {
                        handlers::handle_update(&ctx, update).await;
                    });
                }
            }
            Err(err) => {
                tracing::warn!(%err, "poll failed, backing off");
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
        }
    }
}
