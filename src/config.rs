use crate::utils::{parse_duration, AppError};
use chrono::Duration;
use std::env;

/// Signing settings for bearer tokens
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Expiry in duration notation, e.g. `7d` or `12h`
    pub expires_in: String,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, expires_in: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expires_in: expires_in.into(),
        }
    }

    /// Reads `JWT_SECRET_KEY` and `JWT_EXPIRE`, honouring a `.env` file
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();

        let secret = env::var("JWT_SECRET_KEY")
            .map_err(|_| AppError::Configuration("JWT_SECRET_KEY must be set".to_string()))?;
        let expires_in = env::var("JWT_EXPIRE")
            .map_err(|_| AppError::Configuration("JWT_EXPIRE must be set".to_string()))?;

        let config = Self { secret, expires_in };
        config.expiry()?;
        Ok(config)
    }

    pub fn signing_secret(&self) -> Result<&[u8], AppError> {
        if self.secret.is_empty() {
            return Err(AppError::Configuration(
                "JWT secret must have a value".to_string(),
            ));
        }
        Ok(self.secret.as_bytes())
    }

    pub fn expiry(&self) -> Result<Duration, AppError> {
        parse_duration(&self.expires_in).ok_or_else(|| {
            AppError::Configuration(format!(
                "Invalid JWT expiry \"{}\": expected a number of milliseconds or a duration like \"7d\"",
                self.expires_in
            ))
        })
    }
}

/// Where the user collection lives
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub uri: String,
    pub database: String,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let uri =
            env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let database =
            env::var("MONGODB_DATABASE").unwrap_or_else(|_| "auction_platform".to_string());

        Self { uri, database }
    }
}
