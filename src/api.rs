use crate::config::BackendConfig;
use base64::Engine as _;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Request(String),
    #[error("invalid response from backend: {0}")]
    Response(String),
}

/// Narrow seam to the media-manager REST API. The workflow engine only ever
/// sees this trait; tests substitute a scripted fake.
pub trait MediaServer {
    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError>;
    fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError>;
}

/// Blocking client for a Sonarr or Radarr instance. Authentication is the
/// `X-Api-Key` header plus optional basic-auth credentials.
#[derive(Debug, Clone)]
pub struct ServarrClient {
    base_url: String,
    api_key: String,
    basic_auth: Option<String>,
}

impl ServarrClient {
    pub fn from_config(config: &BackendConfig) -> Self {
        let scheme = if config.ssl { "https" } else { "http" };
        let url_base = config.url_base.trim_matches('/');
        let base_url = if url_base.is_empty() {
            format!("{scheme}://{}:{}/api", config.hostname, config.port)
        } else {
            format!("{scheme}://{}:{}/{url_base}/api", config.hostname, config.port)
        };
        let basic_auth = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => {
                let encoded =
                    base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
                Some(format!("Basic {encoded}"))
            }
            _ => None,
        };
        Self {
            base_url,
            api_key: config.api_key.clone(),
            basic_auth,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn apply_headers(&self, request: ureq::Request) -> ureq::Request {
        let request = request.set("X-Api-Key", &self.api_key);
        match &self.basic_auth {
            Some(value) => request.set("Authorization", value),
            None => request,
        }
    }
}

impl MediaServer for ServarrClient {
    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        let mut url = self.endpoint(path);
        if !query.is_empty() {
            let encoded = query
                .iter()
                .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url = format!("{url}?{encoded}");
        }

        let response = self
            .apply_headers(ureq::get(&url))
            .call()
            .map_err(|e| ApiError::Request(e.to_string()))?;
        response
            .into_json::<Value>()
            .map_err(|e| ApiError::Response(e.to_string()))
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let url = self.endpoint(path);
        let response = self
            .apply_headers(ureq::post(&url))
            .send_json(body.clone())
            .map_err(|e| ApiError::Request(e.to_string()))?;
        response
            .into_json::<Value>()
            .map_err(|e| ApiError::Response(e.to_string()))
    }
}
