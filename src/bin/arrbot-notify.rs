//! One-shot import notification hook. Sonarr invokes this binary with the
//! download details in the environment; it formats a single message, sends it
//! to the configured notify target, and exits.

use arrbot::config;
use arrbot::messages;
use arrbot::telegram::{ChatTransport, ReplyMarkup, TelegramClient};

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn run() -> Result<(), String> {
    let state_root = config::state_root().map_err(|e| e.to_string())?;
    let config = config::load_config(&config::config_path(&state_root)).map_err(|e| e.to_string())?;

    let target = if config.notify_id != 0 {
        config.notify_id
    } else {
        config.owner
    };
    if target == 0 {
        return Err("no notify target configured; set bot.notifyId or bot.owner".to_string());
    }

    let series = env_or("SONARR_SERIES_TITLE", "Unknown series");
    let season = env_or("SONARR_EPISODEFILE_SEASONNUMBER", "?");
    let episodes = env_or("SONARR_EPISODEFILE_EPISODENUMBERS", "?");
    let quality = env_or("SONARR_EPISODEFILE_QUALITY", "unknown quality");

    let telegram = TelegramClient::new(config.bot_token.clone());
    telegram
        .send(
            target,
            &messages::download_notification(&series, &season, &episodes, &quality),
            ReplyMarkup::None,
        )
        .map_err(|e| e.to_string())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
