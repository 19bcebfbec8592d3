//! Password hashing and strength policy.

use std::borrow::Cow;

use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::config::{Argon2 as ArgonConfig, PasswordRule};

type Result<T> = std::result::Result<T, CryptoError>;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
}

/// Password manager that uses Argon2id and PHC string format for hashing and
/// verification.
pub struct PasswordManager {
    params: Params,
}

impl PasswordManager {
    /// Create a new [`PasswordManager`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
    }

    /// Hash password using Argon2id.
    pub fn hash_password(&self, password: impl AsRef<[u8]>) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_ref(), &salt)
            .map_err(|e| CryptoError::Argon2(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Verify password against a PHC.
    pub fn verify_password(
        &self,
        password: impl AsRef<[u8]>,
        phc_hash: &str,
    ) -> Result<()> {
        let parsed = PasswordHash::new(phc_hash)
            .map_err(|e| CryptoError::Argon2(e.to_string()))?;

        self.argon2()
            .verify_password(password.as_ref(), &parsed)
            .map_err(|e| CryptoError::Argon2(e.to_string()))
    }
}

/// Strength check applied to passwords on account creation.
pub trait PasswordPolicy: Send + Sync {
    /// Returns the message to show when `password` is rejected.
    fn check(&self, password: &str) -> std::result::Result<(), Cow<'static, str>>;
}

/// Length bounds plus a refusal of single-character passwords.
#[derive(Debug, Clone)]
pub struct DefaultPolicy {
    rule: PasswordRule,
}

impl DefaultPolicy {
    pub fn new(rule: PasswordRule) -> Self {
        Self { rule }
    }
}

impl PasswordPolicy for DefaultPolicy {
    fn check(&self, password: &str) -> std::result::Result<(), Cow<'static, str>> {
        let PasswordRule { min, max } = self.rule;
        let length = password.chars().count();

        if length < min || length > max {
            return Err(format!(
                "The password must be between {min} and {max} characters."
            )
            .into());
        }

        let mut chars = password.chars();
        if let Some(first) = chars.next() {
            if chars.all(|c| c == first) {
                return Err("The password is too weak.".into());
            }
        }

        Ok(())
    }
}
