/// One-time code generation and hashing
use rand::Rng;
use sha2::{Digest, Sha256};

pub const OTP_LENGTH: usize = 6;

/// Generate a fixed-length numeric code.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let code: u32 = rng.gen_range(0..1_000_000);
    format!("{:06}", code)
}

/// One-way hash of a code; only this form is ever persisted.
pub fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_code(candidate: &str, code_hash: &str) -> bool {
    hash_code(candidate) == code_hash
}
