use crate::{config::JwtConfig, models::User, utils::AppError};
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub id: String,  // user _id, hex encoded
    pub iat: usize,  // issued at
    pub exp: usize,  // expiration
    pub jti: String, // JWT ID
}

impl Claims {
    pub fn user_id(&self) -> Result<ObjectId, AppError> {
        ObjectId::parse_str(&self.id)
            .map_err(|e| AppError::InvalidToken(format!("Malformed user id: {}", e)))
    }
}

/// Signs a bearer token for `user_id` that expires after the configured duration
pub fn issue_token(user_id: &ObjectId, config: &JwtConfig) -> Result<String, AppError> {
    issue_token_at(user_id, config, Utc::now())
}

/// Same as [`issue_token`] with an explicit issue time
pub fn issue_token_at(
    user_id: &ObjectId,
    config: &JwtConfig,
    issued_at: DateTime<Utc>,
) -> Result<String, AppError> {
    let secret = config.signing_secret()?;
    let expiry = config.expiry()?;

    let iat = issued_at.timestamp();
    let exp = iat + expiry.num_milliseconds().div_euclid(1000);

    let claims = Claims {
        id: user_id.to_hex(),
        iat: iat.max(0) as usize,
        exp: exp.max(0) as usize,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AppError::InvalidToken(format!("Failed to generate token: {}", e)))
}

/// Decodes and checks a token; expiry is enforced without leeway
pub fn verify_token(token: &str, config: &JwtConfig) -> Result<Claims, AppError> {
    verify_token_at(token, config, Utc::now())
}

/// Same as [`verify_token`] against an explicit clock. A token stops being
/// valid at the second named by `exp`.
pub fn verify_token_at(
    token: &str,
    config: &JwtConfig,
    now: DateTime<Utc>,
) -> Result<Claims, AppError> {
    let secret = config.signing_secret()?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    // checked below so that `now == exp` is already expired
    validation.validate_exp = false;

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::InvalidToken(e.to_string()),
        })?;

    if now.timestamp() >= claims.exp as i64 {
        return Err(AppError::TokenExpired);
    }
    Ok(claims)
}

impl User {
    /// Issues a bearer token carrying this user's id
    pub fn generate_json_web_token(&self, config: &JwtConfig) -> Result<String, AppError> {
        issue_token(&self.id, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn config() -> JwtConfig {
        JwtConfig::new("test-secret-key", "7d")
    }

    #[test]
    fn token_carries_user_id() {
        let user_id = ObjectId::new();
        let token = issue_token(&user_id, &config()).unwrap();
        let claims = verify_token(&token, &config()).unwrap();
        assert_eq!(claims.id, user_id.to_hex());
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn token_expires_after_configured_duration() {
        let user_id = ObjectId::new();
        let issued_at = Utc::now() - Duration::days(7) - Duration::seconds(5);
        let token = issue_token_at(&user_id, &config(), issued_at).unwrap();
        assert!(matches!(
            verify_token(&token, &config()),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn token_is_valid_just_before_expiry() {
        let user_id = ObjectId::new();
        let issued_at = Utc::now() - Duration::days(7) + Duration::minutes(5);
        let token = issue_token_at(&user_id, &config(), issued_at).unwrap();
        assert!(verify_token(&token, &config()).is_ok());
    }

    #[test]
    fn token_is_expired_at_the_exp_second() {
        let user_id = ObjectId::new();
        let issued_at = Utc::now();
        let token = issue_token_at(&user_id, &config(), issued_at).unwrap();
        let exp = issued_at + Duration::days(7);

        assert!(verify_token_at(&token, &config(), exp - Duration::seconds(1)).is_ok());
        assert!(matches!(
            verify_token_at(&token, &config(), exp),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn sub_second_expiry_floors_to_whole_seconds() {
        let config = JwtConfig::new("test-secret-key", "1500");
        let token = issue_token(&ObjectId::new(), &config).unwrap();
        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.exp - claims.iat, 1);
    }

    #[test]
    fn rejects_token_signed_with_another_secret() {
        let token = issue_token(&ObjectId::new(), &config()).unwrap();
        let other = JwtConfig::new("another-secret", "7d");
        assert!(matches!(
            verify_token(&token, &other),
            Err(AppError::InvalidToken(_))
        ));
    }

    #[test]
    fn missing_configuration_fails_issuance() {
        let user_id = ObjectId::new();
        assert!(matches!(
            issue_token(&user_id, &JwtConfig::new("", "7d")),
            Err(AppError::Configuration(_))
        ));
        assert!(matches!(
            issue_token(&user_id, &JwtConfig::new("secret", "")),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn tokens_are_unique_per_issue() {
        let user_id = ObjectId::new();
        let a = issue_token(&user_id, &config()).unwrap();
        let b = issue_token(&user_id, &config()).unwrap();
        assert_ne!(a, b);
    }
}
