//! Password hashing and verification.
//!
//! Argon2 is deliberately expensive, so both operations run on the blocking
//! pool and never stall the request executor.

use anyhow::{Context, Result, anyhow};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::Argon2;
use async_trait::async_trait;

#[async_trait]
pub trait PasswordVerifier: Send + Sync {
    /// Produce a self-describing hash suitable for storage.
    async fn hash(&self, password: &str) -> Result<String>;

    /// `Ok(false)` on mismatch or when `hash` cannot be parsed.
    async fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

#[derive(Clone, Default)]
pub struct Argon2Verifier {
    argon2: Argon2<'static>,
}

impl Argon2Verifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Argon2id with explicit cost parameters, cheap enough for tests.
    #[cfg(test)]
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self> {
        use argon2::{Algorithm, Params, Version};

        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| anyhow!("invalid argon2 parameters: {e}"))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

#[async_trait]
impl PasswordVerifier for Argon2Verifier {
    async fn hash(&self, password: &str) -> Result<String> {
        let argon2 = self.argon2.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| anyhow!("failed to hash password: {e}"))
        })
        .await
        .context("Password hashing task failed")?
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let argon2 = self.argon2.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || match PasswordHash::new(&hash) {
            Ok(parsed) => argon2.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                tracing::warn!("Stored password hash is unparseable: {}", e);
                false
            }
        })
        .await
        .context("Password verification task failed")
    }
}
