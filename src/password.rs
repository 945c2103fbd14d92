use std::sync::Arc;

use tracing::warn;

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(String);

/// Opaque password capability used for private categories and threads.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, HashError>;
    fn verify(&self, plain: &str, hash: &str) -> bool;
}

pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost: cost.clamp(4, 31) }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plain: &str) -> Result<String, HashError> {
        bcrypt::hash(plain, self.cost).map_err(|e| HashError(e.to_string()))
    }

    fn verify(&self, plain: &str, hash: &str) -> bool {
        match bcrypt::verify(plain, hash) {
            Ok(ok) => ok,
            Err(e) => {
                // a malformed stored hash can never match
                warn!("bcrypt verify failed: {e}");
                false
            }
        }
    }
}

pub fn build_hasher(cost: u32) -> Arc<dyn PasswordHasher> {
    Arc::new(BcryptHasher::new(cost))
}

/// `hash` on the blocking pool, away from the async workers.
pub async fn hash_blocking(hasher: Arc<dyn PasswordHasher>, plain: &str) -> Result<String, HashError> {
    let plain = plain.to_owned();
    tokio::task::spawn_blocking(move || hasher.hash(&plain))
        .await
        .map_err(|e| HashError(e.to_string()))?
}

/// `verify` on the blocking pool. A failed task counts as a mismatch.
pub async fn verify_blocking(hasher: Arc<dyn PasswordHasher>, plain: &str, hash: &str) -> bool {
    let (plain, hash) = (plain.to_owned(), hash.to_owned());
    match tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash)).await {
        Ok(ok) => ok,
        Err(e) => {
            warn!("password verify task failed: {e}");
            false
        }
    }
}
