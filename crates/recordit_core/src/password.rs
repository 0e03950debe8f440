//! Argon2id password hashes in PHC string form.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::{RecordError, Result};

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| RecordError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

/// A stored hash that does not parse never verifies.
pub fn verify_password(hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_the_original_password() {
        let hash = hash_password("recordit").unwrap();
        assert!(verify_password(&hash, "recordit"));
        assert!(!verify_password(&hash, "recordIt"));
    }

    #[test]
    fn same_password_hashes_differently() {
        assert_ne!(
            hash_password("recordit").unwrap(),
            hash_password("recordit").unwrap()
        );
    }

    #[test]
    fn stored_form_is_phc() {
        let hash = hash_password("x").unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        for bad in ["", "$argon2id$", "sha256:1$00$00", "plain-text"] {
            assert!(!verify_password(bad, "x"), "{bad}");
        }
    }
}
