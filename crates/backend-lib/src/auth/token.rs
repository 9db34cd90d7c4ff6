// ============================
// crates/backend-lib/src/auth/token.rs
// ============================
//! Random tokens for sessions and password reset links.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};

/// 32 bytes = 256 bits of entropy
const DEFAULT_TOKEN_BYTES: usize = 32;

/// URL-safe token without padding, drawn from OS entropy
pub fn generate_token() -> String {
    generate_token_with_size(DEFAULT_TOKEN_BYTES)
}

pub fn generate_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}
