use crate::{models::User, utils::AppError};

/// bcrypt work factor for stored passwords
pub const HASH_COST: u32 = 10;

pub async fn hash_password(plain: &str) -> Result<String, AppError> {
    let plain = plain.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, HASH_COST))
        .await
        .map_err(|e| AppError::Hashing(format!("Task join error: {}", e)))?
        .map_err(|e| AppError::Hashing(format!("Failed to hash password: {}", e)))
}

pub async fn verify_password(candidate: &str, hash: &str) -> Result<bool, AppError> {
    let candidate = candidate.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(candidate, &hash))
        .await
        .map_err(|e| AppError::Hashing(format!("Task join error: {}", e)))?
        .map_err(|e| AppError::Hashing(format!("Password verification error: {}", e)))
}

/// Write-path step: hashes the password if it was set since the record was loaded.
/// Returns whether a hash was computed. A hashed password is never hashed again.
pub async fn hash_password_if_modified(user: &mut User) -> Result<bool, AppError> {
    if !user.is_password_modified() {
        return Ok(false);
    }

    let plain = user
        .password()
        .ok_or_else(|| AppError::InvalidRequest("Password is required".to_string()))?;
    let hashed = hash_password(plain).await?;
    user.store_password_hash(hashed);
    Ok(true)
}

impl User {
    /// Checks a plaintext candidate against the stored hash.
    ///
    /// Fails when the record was read without its password; a mismatch is `Ok(false)`.
    pub async fn compare_password(&self, candidate: &str) -> Result<bool, AppError> {
        if self.is_password_modified() {
            return Err(AppError::InvalidRequest(
                "Password has not been hashed yet; save the user first".to_string(),
            ));
        }
        let hash = self.password().ok_or_else(|| {
            AppError::InvalidRequest("Password was not loaded for this user".to_string())
        })?;
        verify_password(candidate, hash).await
    }
}
