use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

const CONFIRMATION_CODE_BYTES: usize = 20;

/// Generate a one-time confirmation code handed to the user out of band.
/// Only its digest is persisted.
pub fn generate_confirmation_code() -> String {
    let mut bytes = [0u8; CONFIRMATION_CODE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_confirmation_code(code: &str) -> String {
    let digest = Sha256::digest(code.as_bytes());
    hex::encode(digest)
}

pub fn verify_confirmation_code(code: &str, stored_hash: &str) -> bool {
    hash_confirmation_code(code) == stored_hash
}

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trip() {
        let code = generate_confirmation_code();
        assert_eq!(code.len(), CONFIRMATION_CODE_BYTES * 2);
        let hash = hash_confirmation_code(&code);
        assert!(verify_confirmation_code(&code, &hash));
        assert!(!verify_confirmation_code("wrong", &hash));
    }
}
