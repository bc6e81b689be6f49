pub const REMOVE_BG_API_KEY_ENV: &str = "REMOVE_BG_API_KEY";
pub const REMOVE_BG_ENDPOINT_ENV: &str = "REMOVE_BG_ENDPOINT";

/// Shipped in the sample .env; treated the same as an unset key.
pub const PLACEHOLDER_API_KEY: &str = "your_api_key_here";

const DEFAULT_REMOVE_BG_ENDPOINT: &str = "https://api.remove.bg/v1.0/removebg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveBgSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl RemoveBgSettings {
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var(REMOVE_BG_ENDPOINT_ENV)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| String::from(DEFAULT_REMOVE_BG_ENDPOINT)),
            api_key: resolve_api_key(std::env::var(REMOVE_BG_API_KEY_ENV).ok()),
        }
    }

    pub fn with_key(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: resolve_api_key(Some(api_key.into())),
        }
    }

    pub fn unconfigured(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
        }
    }
}

fn resolve_api_key(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != PLACEHOLDER_API_KEY)
}
