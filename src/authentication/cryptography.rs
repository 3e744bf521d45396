use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::RngCore;

use crate::error::{Error, ErrorKind};

pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    Ok(argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ErrorKind::InternalServerError.new(&format!("Failed to hash password: {e}")))?
        .to_string())
}

/// A stored value that is not a valid hash (e.g. an unusable password) never
/// verifies.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let argon2 = Argon2::default();

    match PasswordHash::new(password_hash) {
        Ok(parsed_hash) => argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok(),
        Err(_) => false,
    }
}

/// Random key material for signing tokens when no secret is configured.
pub fn generate_secret() -> Vec<u8> {
    let mut secret = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}
