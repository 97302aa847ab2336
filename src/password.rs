//! Argon2 password hashing for stored user records.

use crate::config::Config;
use crate::error::{Result, StoreError};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Hashes and verifies passwords with fixed Argon2id parameters.
#[derive(Clone)]
pub struct PasswordHashing {
    params: Params,
}

impl PasswordHashing {
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, Params::DEFAULT_P_COST, None)
            .map_err(|e| StoreError::Config(format!("invalid password hashing parameters: {e}")))?;
        Ok(Self { params })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.password_memory_kib, config.password_iterations)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Produces a salted PHC string, e.g. `$argon2id$v=19$m=...`.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| StoreError::PasswordHash(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Checks `candidate` against a stored PHC string. The parameters
    /// embedded in the stored hash win over this hasher's own.
    pub fn verify(&self, stored: &str, candidate: &str) -> Result<bool> {
        let parsed =
            PasswordHash::new(stored).map_err(|e| StoreError::PasswordHash(e.to_string()))?;
        Ok(self
            .argon2()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> PasswordHashing {
        PasswordHashing::new(Params::MIN_M_COST, 1).unwrap()
    }

    #[test]
    fn test_hash_is_salted_phc_string() {
        let hasher = fast();
        let first = hasher.hash("hunter2").unwrap();
        let second = hasher.hash("hunter2").unwrap();
        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify() {
        let hasher = fast();
        let stored = hasher.hash("hunter2").unwrap();
        assert!(hasher.verify(&stored, "hunter2").unwrap());
        assert!(!hasher.verify(&stored, "hunter3").unwrap());
    }

    #[test]
    fn test_verify_rejects_non_phc_value() {
        let result = fast().verify("plaintext", "plaintext");
        assert!(matches!(result, Err(StoreError::PasswordHash(_))));
    }

    #[test]
    fn test_invalid_params() {
        assert!(matches!(
            PasswordHashing::new(1, 0),
            Err(StoreError::Config(_))
        ));
    }
}
