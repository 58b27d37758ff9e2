use crate::error::DeskError;
use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};

/// Hash `password` into a PHC string (argon2id, random salt).
///
/// Runs on the blocking pool; argon2 is deliberately slow.
pub async fn hash_password(password: String) -> Result<String, DeskError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DeskError::PasswordHash(e.to_string()))
    })
    .await
    .map_err(|e| DeskError::UnexpectedError(format!("hash task failed: {e}")))?
}

/// Check `password` against a stored PHC string. A malformed hash never verifies.
pub async fn verify_password(password: String, hash: String) -> Result<bool, DeskError> {
    tokio::task::spawn_blocking(move || {
        let Ok(parsed) = PasswordHash::new(&hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
    .await
    .map_err(|e| DeskError::UnexpectedError(format!("verify task failed: {e}")))
}
