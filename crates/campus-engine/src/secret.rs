//! Argon2 hashing for operator secrets such as the setup key and the admin
//! verification code.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use campus_core::{Error, Result};
use rand_core::OsRng;

/// Hash `secret` into a PHC string, e.g. `$argon2id$v=19$…`.
pub fn hash_secret(secret: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(secret.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::InvalidInput(format!("argon2 error: {e}")))
}

/// Check `secret` against a PHC string. A malformed hash is an error; a
/// mismatch is `Ok(false)`.
pub fn verify_secret(secret: &str, phc: &str) -> Result<bool> {
  let parsed = PasswordHash::new(phc)
    .map_err(|e| Error::InvalidInput(format!("malformed argon2 hash: {e}")))?;
  Ok(
    Argon2::default()
      .verify_password(secret.as_bytes(), &parsed)
      .is_ok(),
  )
}
