/// Server configuration loaded from the environment.
///
/// Everything here can be overridden at startup; missing variables fall back to
/// the defaults below. A malformed variable is a startup error.
use thiserror::Error;

/// Address the HTTP server binds when `CHESS_RELAY_BIND` is unset.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";

/// Value of `Access-Control-Allow-Origin` when `CHESS_RELAY_ALLOWED_ORIGINS` is unset.
pub const DEFAULT_ALLOWED_ORIGINS: &str = "*";

pub const ENV_BIND: &str = "CHESS_RELAY_BIND";
pub const ENV_ALLOWED_ORIGINS: &str = "CHESS_RELAY_ALLOWED_ORIGINS";
pub const ENV_TOKENS: &str = "CHESS_RELAY_TOKENS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: malformed entry '{entry}' (expected token=user_id:display_name)")]
    MalformedToken { var: &'static str, entry: String },

    #[error("{var}: duplicate token for user '{user_id}'")]
    DuplicateToken { var: &'static str, user_id: String },
}

/// One bearer token accepted by the static authenticator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub token: String,
    pub user_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub allowed_origins: String,
    pub tokens: Vec<TokenGrant>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.to_string(),
            tokens: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(bind) = lookup(ENV_BIND).filter(|v| !v.trim().is_empty()) {
            config.bind_address = bind.trim().to_string();
        }
        if let Some(origins) = lookup(ENV_ALLOWED_ORIGINS).filter(|v| !v.trim().is_empty()) {
            config.allowed_origins = origins.trim().to_string();
        }
        if let Some(tokens) = lookup(ENV_TOKENS) {
            config.tokens = parse_tokens(&tokens)?;
        }
        Ok(config)
    }
}

/// Parse `token=user_id:display_name` entries separated by commas.
pub fn parse_tokens(raw: &str) -> Result<Vec<TokenGrant>, ConfigError> {
    let mut grants: Vec<TokenGrant> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let malformed = || ConfigError::MalformedToken {
            var: ENV_TOKENS,
            entry: entry.to_string(),
        };
        let (token, principal) = entry.split_once('=').ok_or_else(malformed)?;
        let (user_id, display_name) = principal.split_once(':').ok_or_else(malformed)?;
        if token.is_empty() || user_id.is_empty() || display_name.is_empty() {
            return Err(malformed());
        }
        if grants.iter().any(|g| g.user_id == user_id || g.token == token) {
            return Err(ConfigError::DuplicateToken {
                var: ENV_TOKENS,
                user_id: user_id.to_string(),
            });
        }
        grants.push(TokenGrant {
            token: token.to_string(),
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
        });
    }
    Ok(grants)
}
