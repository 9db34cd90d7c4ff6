// =========================
// tests/unit/password_tests.rs
// =========================
use backend_lib::auth::{verify_password, PasswordHasherConfig};

#[test]
fn test_password_hashing_and_verification() {
    let hasher = PasswordHasherConfig::new(4).unwrap();
    let password = "SecureP@ssw0rd";
    let hash = hasher.hash(password).unwrap();

    assert_ne!(password, hash);
    assert!(verify_password(&hash, password));
    assert!(!verify_password(&hash, "SecureP@ssw0rD"));
}

#[test]
fn test_hash_records_its_cost() {
    // Hashes stay verifiable after the configured cost changes
    let cheap = PasswordHasherConfig::new(4).unwrap();
    let hash = cheap.hash("SecureP@ssw0rd").unwrap();
    assert!(hash.starts_with("$scrypt$ln=4,"));
    assert!(verify_password(&hash, "SecureP@ssw0rd"));
}
