use crate::error::ConfigError;

/// Environment variable holding the Replicate API token.
pub const TOKEN_VAR: &str = "REPLICATE_API_TOKEN";

/// Optional override for the Replicate API base URL.
pub const BASE_URL_VAR: &str = "REPLICATE_BASE_URL";

/// Startup configuration, read once from the environment before any input
/// is accepted. A missing credential is fatal here rather than surfacing as
/// an opaque provider error on first use.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_token: String,
    pub base_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_token = std::env::var(TOKEN_VAR)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken(TOKEN_VAR))?;

        Ok(Self {
            api_token,
            base_url: std::env::var(BASE_URL_VAR).ok(),
        })
    }
}
