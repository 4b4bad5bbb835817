use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("stored password hash is malformed: {0}")]
    Malformed(String),
    #[error("hashing task failed")]
    Task(#[from] tokio::task::JoinError),
}

/// Hashes a password off the async runtime. Argon2 burns tens of
/// milliseconds of CPU, which would stall every other request on the
/// worker thread.
pub async fn hash_password(plain: String) -> Result<String, HashError> {
    tokio::task::spawn_blocking(move || hash_password_sync(&plain)).await?
}

/// Verifies a password off the async runtime, same reasoning as
/// [`hash_password`].
pub async fn verify_password(plain: String, hash: String) -> Result<bool, HashError> {
    tokio::task::spawn_blocking(move || verify_password_sync(&plain, &hash)).await?
}

fn hash_password_sync(plain: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            HashError::Hashing(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

fn verify_password_sync(plain: &str, hash: &str) -> Result<bool, HashError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        HashError::Malformed(e.to_string())
    })?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => {
            error!(error = %e, "argon2 verify error");
            Err(HashError::Malformed(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password_sync(password).expect("hashing should succeed");
        assert!(verify_password_sync(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password_sync(password).expect("hashing should succeed");
        assert!(!verify_password_sync("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password_sync("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, HashError::Malformed(_)));
    }

    #[test]
    fn same_password_hashes_differently_each_time() {
        let password = "repeat-me";
        let first = hash_password_sync(password).expect("hashing should succeed");
        let second = hash_password_sync(password).expect("hashing should succeed");
        assert_ne!(first, second);
        assert!(verify_password_sync(password, &first).expect("verify"));
        assert!(verify_password_sync(password, &second).expect("verify"));
    }

    #[tokio::test]
    async fn async_wrappers_agree_with_sync_versions() {
        let hash = hash_password("async-pass".into()).await.expect("hash");
        assert!(verify_password("async-pass".into(), hash.clone())
            .await
            .expect("verify"));
        assert!(!verify_password("other".into(), hash).await.expect("verify"));
    }
}
