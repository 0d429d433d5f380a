use bcrypt::{hash, verify, DEFAULT_COST};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// bcrypt is CPU-bound, so both operations run on the blocking pool
pub async fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let plain = plain.to_string();
    let hashed = tokio::task::spawn_blocking(move || hash(plain, DEFAULT_COST)).await??;
    Ok(hashed)
}

pub async fn verify_password(plain: &str, hashed: &str) -> Result<bool, PasswordError> {
    let plain = plain.to_string();
    let hashed = hashed.to_string();
    let ok = tokio::task::spawn_blocking(move || verify(plain, &hashed)).await??;
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn verifies_only_the_original_password() {
        let hashed = hash_password("correct-horse").await.unwrap();
        assert_ne!(hashed, "correct-horse");
        assert!(verify_password("correct-horse", &hashed).await.unwrap());
        assert!(!verify_password("battery-staple", &hashed).await.unwrap());
    }
}
