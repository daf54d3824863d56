use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid json in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("missing telegram bot token; set `telegram.botToken` or TELEGRAM_BOTTOKEN")]
    MissingBotToken,
    #[error("missing api key for {backend}; set `{backend}.apiKey` or {env_var}")]
    MissingApiKey {
        backend: &'static str,
        env_var: &'static str,
    },
    #[error("failed to resolve home directory for state root")]
    HomeDirectoryUnavailable,
}

pub const STATE_DIR_NAME: &str = ".arrbot";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const ACL_FILE_NAME: &str = "acl.json";

const DEFAULT_MAX_RESULTS: usize = 15;
const DEFAULT_SONARR_PORT: u16 = 8989;
const DEFAULT_RADARR_PORT: u16 = 7878;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramSettings {
    pub bot_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct BotSettings {
    pub password: Option<String>,
    pub owner: Option<i64>,
    pub notify_id: Option<i64>,
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendSettings {
    pub hostname: Option<String>,
    pub api_key: Option<String>,
    pub port: Option<u16>,
    pub url_base: Option<String>,
    pub ssl: Option<bool>,
    pub username: Option<String>,
    pub password: Option<String>,
    // Movie defaults; ignored for the series backend.
    pub default_profile_id: Option<i64>,
    pub default_root_folder: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigFile {
    pub telegram: TelegramSettings,
    pub bot: BotSettings,
    pub sonarr: BackendSettings,
    pub radarr: BackendSettings,
}

/// Fully resolved process configuration: file values merged with environment
/// fallbacks, defaults applied, required fields validated.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bot_token: String,
    pub password: String,
    pub owner: i64,
    pub notify_id: i64,
    pub max_results: usize,
    pub sonarr: BackendConfig,
    pub radarr: BackendConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub hostname: String,
    pub api_key: String,
    pub port: u16,
    pub url_base: String,
    pub ssl: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub default_profile_id: Option<i64>,
    pub default_root_folder: Option<String>,
}

pub fn state_root() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = env_string("ARRBOT_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var_os("HOME").ok_or(ConfigError::HomeDirectoryUnavailable)?;
    Ok(PathBuf::from(home).join(STATE_DIR_NAME))
}

pub fn config_path(state_root: &Path) -> PathBuf {
    state_root.join(CONFIG_FILE_NAME)
}

pub fn acl_path(state_root: &Path) -> PathBuf {
    state_root.join(ACL_FILE_NAME)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    env_string(key).map(|v| matches!(v.trim(), "1" | "true" | "yes"))
}

/// A missing config file is not an error; every field can come from the
/// environment. A file that exists but is not valid JSON aborts startup.
pub fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let raw = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })
}

fn resolve_backend(
    file: &BackendSettings,
    backend: &'static str,
    env_prefix: &str,
    default_port: u16,
    api_key_env: &'static str,
) -> Result<BackendConfig, ConfigError> {
    let api_key = file
        .api_key
        .clone()
        .or_else(|| env_string(&format!("{env_prefix}_APIKEY")))
        .ok_or(ConfigError::MissingApiKey {
            backend,
            env_var: api_key_env,
        })?;
    Ok(BackendConfig {
        hostname: file
            .hostname
            .clone()
            .or_else(|| env_string(&format!("{env_prefix}_HOST")))
            .unwrap_or_else(|| "localhost".to_string()),
        api_key,
        port: file
            .port
            .or_else(|| env_parse(&format!("{env_prefix}_PORT")))
            .unwrap_or(default_port),
        url_base: file
            .url_base
            .clone()
            .or_else(|| env_string(&format!("{env_prefix}_URLBASE")))
            .unwrap_or_default(),
        ssl: file
            .ssl
            .or_else(|| env_bool(&format!("{env_prefix}_SSL")))
            .unwrap_or(false),
        username: file
            .username
            .clone()
            .or_else(|| env_string(&format!("{env_prefix}_USERNAME"))),
        password: file
            .password
            .clone()
            .or_else(|| env_string(&format!("{env_prefix}_PASSWORD"))),
        default_profile_id: file
            .default_profile_id
            .or_else(|| env_parse(&format!("{env_prefix}_DEFAULT_PROFILEID"))),
        default_root_folder: file
            .default_root_folder
            .clone()
            .or_else(|| env_string(&format!("{env_prefix}_DEFAULT_ROOTFOLDER"))),
    })
}

pub fn resolve_config(file: &ConfigFile) -> Result<Config, ConfigError> {
    let bot_token = file
        .telegram
        .bot_token
        .clone()
        .or_else(|| env_string("TELEGRAM_BOTTOKEN"))
        .ok_or(ConfigError::MissingBotToken)?;

    Ok(Config {
        bot_token,
        password: file
            .bot
            .password
            .clone()
            .or_else(|| env_string("BOT_PASSWORD"))
            .unwrap_or_default(),
        owner: file.bot.owner.or_else(|| env_parse("BOT_OWNER")).unwrap_or(0),
        notify_id: file
            .bot
            .notify_id
            .or_else(|| env_parse("BOT_NOTIFYID"))
            .unwrap_or(0),
        max_results: file
            .bot
            .max_results
            .or_else(|| env_parse("BOT_MAXRESULTS"))
            .unwrap_or(DEFAULT_MAX_RESULTS),
        sonarr: resolve_backend(
            &file.sonarr,
            "sonarr",
            "SONARR",
            DEFAULT_SONARR_PORT,
            "SONARR_APIKEY",
        )?,
        radarr: resolve_backend(
            &file.radarr,
            "radarr",
            "RADARR",
            DEFAULT_RADARR_PORT,
            "RADARR_APIKEY",
        )?,
    })
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let file = load_config_file(path)?;
    resolve_config(&file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_file() -> ConfigFile {
        serde_json::from_str(
            r#"{
                "telegram": { "botToken": "123:abc" },
                "bot": { "password": "hunter2", "owner": 42, "notifyId": 99, "maxResults": 5 },
                "sonarr": { "hostname": "sonarr.local", "apiKey": "sk", "port": 9000 },
                "radarr": {
                    "apiKey": "rk",
                    "defaultProfileId": 3,
                    "defaultRootFolder": "/movies"
                }
            }"#,
        )
        .expect("parse sample config")
    }

    #[test]
    fn resolves_file_values_and_defaults() {
        let config = resolve_config(&sample_file()).expect("resolve");
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.owner, 42);
        assert_eq!(config.max_results, 5);
        assert_eq!(config.sonarr.hostname, "sonarr.local");
        assert_eq!(config.sonarr.port, 9000);
        assert!(!config.sonarr.ssl);
        assert_eq!(config.radarr.hostname, "localhost");
        assert_eq!(config.radarr.port, 7878);
        assert_eq!(config.radarr.default_profile_id, Some(3));
        assert_eq!(config.radarr.default_root_folder.as_deref(), Some("/movies"));
    }

    #[test]
    fn missing_bot_token_is_rejected() {
        let mut file = sample_file();
        file.telegram.bot_token = None;
        std::env::remove_var("TELEGRAM_BOTTOKEN");
        assert!(matches!(
            resolve_config(&file),
            Err(ConfigError::MissingBotToken)
        ));
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let temp = tempdir().expect("tempdir");
        let file = load_config_file(&temp.path().join("config.json")).expect("load");
        assert_eq!(file, ConfigFile::default());
    }

    #[test]
    fn malformed_config_file_aborts() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.json");
        fs::write(&path, "{ not json").expect("write");
        assert!(matches!(
            load_config_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn backend_requires_api_key() {
        let mut file = sample_file();
        file.radarr.api_key = None;
        std::env::remove_var("RADARR_APIKEY");
        assert!(matches!(
            resolve_config(&file),
            Err(ConfigError::MissingApiKey {
                backend: "radarr",
                ..
            })
        ));
    }
}
