// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
use scrypt::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Params, Scrypt,
};
use zeroize::Zeroize;

/// Hashes and verifies passwords with scrypt
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasherConfig {
    params: Params,
}

impl PasswordHasherConfig {
    /// Build a hasher with the given cost (log2 of N); r and p use scrypt defaults
    pub fn new(log_n: u8) -> anyhow::Result<Self> {
        let params = Params::new(log_n, Params::RECOMMENDED_R, Params::RECOMMENDED_P, Params::RECOMMENDED_LEN)
            .map_err(|e| anyhow::anyhow!("invalid scrypt parameters: {e}"))?;
        Ok(Self { params })
    }

    /// Hash a password into a PHC string
    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Scrypt
            .hash_password_customized(plain.as_bytes(), None, None, self.params, &salt)
            .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?
            .to_string();
        Ok(hash)
    }

    /// Hash a password and wipe the plaintext
    pub fn hash_secure(&self, plain: &mut String) -> anyhow::Result<String> {
        let hash = self.hash(plain);
        plain.zeroize();
        hash
    }
}

/// Verify a password against a PHC hash. The cost is read from the hash.
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
}
