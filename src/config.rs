/// Configuration management
use serde::Deserialize;

/// Signing material and lifetimes for both signature tiers.
///
/// All four secrets are independent: a token minted under the system tier can
/// never be verified with the user-tier secrets, and vice versa. Missing
/// secrets fail at startup, not per request.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSettings {
    pub access_user_token_secret: String,
    pub refresh_user_token_secret: String,
    pub access_system_token_secret: String,
    pub refresh_system_token_secret: String,
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: i64,
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: i64,
}

impl TokenSettings {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}

fn default_access_ttl_secs() -> i64 {
    60 * 60 // 1 hour
}

fn default_refresh_ttl_secs() -> i64 {
    60 * 60 * 24 * 365 // 1 year
}

/// SMTP relay settings for outbound OTP mail.
///
/// An empty host puts the sender in no-op mode (log only), which is what
/// tests and local development run with.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default = "default_smtp_from")]
    pub smtp_from: String,
}

impl EmailSettings {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_from() -> String {
    "LinkSphere <no-reply@linksphere.dev>".to_string()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub tokens: TokenSettings,
    pub email: EmailSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenv::dotenv().ok();

        Ok(Config {
            tokens: TokenSettings::from_env()?,
            email: EmailSettings::from_env()?,
        })
    }
}
