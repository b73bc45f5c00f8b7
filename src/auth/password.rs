use bcrypt::BcryptError;

/// Hash a password on the blocking pool.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, super::AuthError> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

/// Constant-time verify via bcrypt. A malformed stored hash verifies as false.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, super::AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let verified = tokio::task::spawn_blocking(move || {
        bcrypt::verify(password, &hash).or_else(|e| match e {
            BcryptError::InvalidHash(_)
            | BcryptError::InvalidPrefix(_)
            | BcryptError::InvalidCost(_) => Ok(false),
            other => Err(other),
        })
    })
    .await??;
    Ok(verified)
}
