use arrbot::acl::AccessControl;
use arrbot::api::ServarrClient;
use arrbot::cache::SessionCache;
use arrbot::config;
use arrbot::router::Router;
use arrbot::shared::logging::append_bot_log_line;
use arrbot::telegram::TelegramClient;
use std::path::Path;
use std::time::Duration;

const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

fn log(state_root: &Path, line: &str) {
    let _ = append_bot_log_line(state_root, line);
}

fn run() -> Result<(), String> {
    let state_root = config::state_root().map_err(|e| e.to_string())?;
    let config = config::load_config(&config::config_path(&state_root)).map_err(|e| e.to_string())?;
    let acl_path = config::acl_path(&state_root);
    let mut acl = AccessControl::load(&acl_path).map_err(|e| e.to_string())?;

    let sonarr = ServarrClient::from_config(&config.sonarr);
    let radarr = ServarrClient::from_config(&config.radarr);
    let telegram = TelegramClient::new(config.bot_token.clone());
    let mut cache = SessionCache::default();

    log(&state_root, "bot started");

    let mut offset = 0i64;
    loop {
        cache.sweep();
        let (updates, next_offset) = match telegram.get_updates(offset) {
            Ok(batch) => batch,
            Err(err) => {
                log(&state_root, &format!("getUpdates failed: {err}"));
                std::thread::sleep(POLL_RETRY_DELAY);
                continue;
            }
        };
        offset = next_offset;

        for update in updates {
            let Some(message) = update.message else {
                continue;
            };
            let (Some(sender), Some(text)) = (message.from, message.text) else {
                continue;
            };
            let user = sender.to_user_record();
            log(
                &state_root,
                &format!("message from {} ({}): {text}", user.display_name(), user.id),
            );

            let mut router = Router {
                config: &config,
                sonarr: &sonarr,
                radarr: &radarr,
                chat: &telegram,
                cache: &mut cache,
                acl: &mut acl,
                acl_path: &acl_path,
            };
            if let Err(err) = router.handle_message(&user, &text) {
                log(&state_root, &format!("reply to {} failed: {err}", user.id));
            }
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
