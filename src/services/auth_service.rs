use crate::{
    config::JwtConfig,
    database::UserStore,
    models::{NewUser, User, UserProfile},
    services::{token_service, user_service},
    utils::AppError,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserProfile,
}

impl AuthResponse {
    fn issue(user: &User, config: &JwtConfig) -> Result<Self, AppError> {
        Ok(AuthResponse {
            success: true,
            token: user.generate_json_web_token(config)?,
            user: user.profile(),
        })
    }
}

/// Looks the user up with its password hash and compares the candidate.
/// Unknown email and wrong password are indistinguishable to the caller.
pub async fn authenticate(
    store: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let user = match store.find_by_email_with_password(email).await? {
        Some(user) => user,
        None => {
            log::warn!("❌ Login failed: no user for {}", email);
            return Err(AppError::InvalidCredentials);
        }
    };

    if !user.compare_password(password).await? {
        log::warn!("❌ Login failed: wrong password for {}", email);
        return Err(AppError::InvalidCredentials);
    }

    Ok(user.without_password())
}

// User login
pub async fn login(
    store: &dyn UserStore,
    config: &JwtConfig,
    request: &LoginRequest,
) -> Result<AuthResponse, AppError> {
    let user = authenticate(store, &request.email, &request.password).await?;
    let response = AuthResponse::issue(&user, config)?;
    log::info!("✅ Login successful: {}", request.email);
    Ok(response)
}

// User registration
pub async fn register(
    store: &dyn UserStore,
    config: &JwtConfig,
    new_user: NewUser,
) -> Result<AuthResponse, AppError> {
    let user = user_service::create_user(store, new_user).await?;
    let response = AuthResponse::issue(&user, config)?;
    log::info!("✅ User registered successfully: {} (role: {})", user.email, user.role);
    Ok(response)
}

/// Resolves the user a bearer token was issued for
pub async fn current_user(
    store: &dyn UserStore,
    config: &JwtConfig,
    token: &str,
) -> Result<User, AppError> {
    let claims = token_service::verify_token(token, config)?;
    let user_id = claims.user_id()?;
    user_service::find_user(store, &user_id).await
}
