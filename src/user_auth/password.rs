//! Password hashing and verification (argon2id, PHC strings).

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
    },
};

use super::error::AuthError;
use crate::account::HashedPassword;
use crate::config::PasswordConfig;

/// Salted adaptive password hasher.
///
/// Every hash gets a fresh random salt, so hashing the same plaintext twice
/// yields two different PHC strings that both verify.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(config: &PasswordConfig) -> Result<Self, AuthError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| AuthError::Internal(format!("Invalid argon2 params: {}", e)))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext credential (CPU-bound, blocks the calling thread)
    pub fn hash(&self, plaintext: &str) -> Result<HashedPassword, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let phc = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AuthError::Internal(format!("Hashing failed: {}", e)))?
            .to_string();
        Ok(HashedPassword::from_phc(phc))
    }

    /// Verify a candidate. A malformed stored hash is a mismatch, not an error.
    pub fn verify(&self, plaintext: &str, hashed: &HashedPassword) -> bool {
        let parsed_hash = match PasswordHash::new(hashed.as_str()) {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!("Stored password hash is malformed: {}", e);
                return false;
            }
        };
        // Parameters come from the PHC string, not from self
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// `hash` on the blocking pool
    pub async fn hash_blocking(&self, plaintext: String) -> Result<HashedPassword, AuthError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AuthError::Internal(format!("Hashing task failed: {}", e)))?
    }

    /// `verify` on the blocking pool; a panicked task counts as a mismatch
    pub async fn verify_blocking(&self, plaintext: String, hashed: HashedPassword) -> bool {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hashed))
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Password verify task failed: {}", e);
                false
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        // Low cost keeps the suite fast; production uses the argon2 defaults
        PasswordHasher::new(&PasswordConfig {
            memory_kib: 256,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_then_verify() {
        let h = hasher();
        let hashed = h.hash("correct horse battery").unwrap();
        assert!(h.verify("correct horse battery", &hashed));
        assert!(!h.verify("correct horse battery!", &hashed));
        assert!(!h.verify("", &hashed));
    }

    #[test]
    fn test_salt_makes_hashes_differ() {
        let h = hasher();
        let a = h.hash("same-password").unwrap();
        let b = h.hash("same-password").unwrap();
        assert_ne!(a, b);
        assert!(h.verify("same-password", &a));
        assert!(h.verify("same-password", &b));
    }

    #[test]
    fn test_phc_format() {
        let hashed = hasher().hash("password123").unwrap();
        assert!(hashed.as_str().starts_with("$argon2id$v=19$"));
        assert!(!hashed.as_str().contains("password123"));
    }

    #[test]
    fn test_malformed_hash_is_false() {
        let h = hasher();
        let bogus = HashedPassword::from_phc("not-a-phc-string".to_string());
        assert!(!h.verify("anything", &bogus));
        let empty = HashedPassword::from_phc(String::new());
        assert!(!h.verify("anything", &empty));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let res = PasswordHasher::new(&PasswordConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(matches!(res, Err(AuthError::Internal(_))));
    }

    #[tokio::test]
    async fn test_blocking_variants() {
        let h = hasher();
        let hashed = h.hash_blocking("async-password".to_string()).await.unwrap();
        assert!(h.verify_blocking("async-password".to_string(), hashed.clone()).await);
        assert!(!h.verify_blocking("other".to_string(), hashed).await);
    }
}
