use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;

const PBKDF2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};
const SALT_LEN: usize = 16;
const CREDENTIAL_LEN: usize = 32;

#[derive(thiserror::Error, Debug)]
pub enum PasswordError {
    #[error("failed to generate salt")]
    SaltGeneration,

    #[error("stored credential is not valid hex")]
    InvalidEncoding,
}

/// Hashed credential as stored on the account row, hex-encoded.
#[derive(Debug, Clone)]
pub struct HashedPassword {
    pub hash: String,
    pub salt: String,
}

/// Derives a PBKDF2-HMAC-SHA256 hash of the password under a fresh random
/// salt.
pub fn hash_password(password: &str) -> Result<HashedPassword, PasswordError> {
    let rng = SystemRandom::new();

    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| PasswordError::SaltGeneration)?;

    let mut credential = [0u8; CREDENTIAL_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        PBKDF2_ITERATIONS,
        &salt,
        password.as_bytes(),
        &mut credential,
    );

    Ok(HashedPassword {
        hash: hex::encode(credential),
        salt: hex::encode(salt),
    })
}

/// Checks a password attempt against the stored salt and hash.
pub fn verify_password(
    password: &str,
    salt_hex: &str,
    hash_hex: &str,
) -> Result<bool, PasswordError> {
    let salt = hex::decode(salt_hex).map_err(|_| PasswordError::InvalidEncoding)?;
    let expected = hex::decode(hash_hex).map_err(|_| PasswordError::InvalidEncoding)?;

    Ok(pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        PBKDF2_ITERATIONS,
        &salt,
        password.as_bytes(),
        &expected,
    )
    .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hashed = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password(
            "correct horse battery staple",
            &hashed.salt,
            &hashed.hash
        )
        .unwrap());
    }

    #[test]
    fn test_wrong_password_fails() {
        let hashed = hash_password("hunter2").unwrap();
        assert!(!verify_password("hunter3", &hashed.salt, &hashed.hash).unwrap());
    }

    #[test]
    fn test_salts_are_unique() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_invalid_encoding_is_rejected() {
        assert!(matches!(
            verify_password("pw", "not hex!", "00"),
            Err(PasswordError::InvalidEncoding)
        ));
    }
}
