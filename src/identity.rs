//! Identity Collaborator
//!
//! Credential hashing and verification live outside the core; this seam is
//! just wide enough for the password-change operation. The SHA-256 reference
//! hasher backs tests and the POC — a production deployment plugs in a real
//! KDF behind the same trait.

use sha2::{Digest, Sha256};

/// Hashing seam for stored credentials
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, raw: &str) -> String;

    fn verify(&self, raw: &str, hash: &str) -> bool {
        self.hash(raw) == hash
    }
}

/// Reference implementation: unsalted SHA-256, hex encoded
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hasher;

impl PasswordHasher for Sha256Hasher {
    fn hash(&self, raw: &str) -> String {
        format!("{:x}", Sha256::digest(raw.as_bytes()))
    }
}
