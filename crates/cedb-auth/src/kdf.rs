//! PBKDF2-HMAC-SHA256 password hashing.

use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::policy::UserRecord;

/// Derived key length in bytes.
pub const KEY_LEN: usize = 32;

/// Derive the hex-encoded key for a password.
pub fn derive_key_hex(password: &str, salt: &str, iterations: u32) -> String {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut key);
    hex::encode(key)
}

/// Check a password against a stored hex hash in constant time.
pub fn verify_password(password: &str, salt: &str, iterations: u32, stored_hex: &str) -> bool {
    let computed = derive_key_hex(password, salt, iterations);
    computed.as_bytes().ct_eq(stored_hex.as_bytes()).into()
}

/// Build a user record with a fresh random salt.
pub fn hash_password(username: &str, password: &str, iterations: u32) -> UserRecord {
    let salt = hex::encode(rand::thread_rng().gen::<[u8; 16]>());
    UserRecord {
        username: username.to_string(),
        password_hash: derive_key_hex(password, &salt, iterations),
        salt: Some(salt),
        iterations: Some(iterations),
    }
}
