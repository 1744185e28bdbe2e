//! The Basic auth users file.
//!
//! `USERS_FILE` holds a JSON list of `{ "username", "password" }` objects.
//! A password is either an Argon2 PHC string (`$argon2...`) or, for files
//! written by older deployments, the plaintext password. An absent or empty
//! list disables authentication.

use std::io::ErrorKind;
use std::path::Path;

use argon2::password_hash::{PasswordHash, PasswordVerifier};
use argon2::Argon2;
use serde::Deserialize;

/// One entry of the users file.
#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    pub username: String,
    pub password: String,
}

/// Read the users file. A missing file yields an empty list.
pub async fn load_users(path: &Path) -> Result<Vec<UserEntry>, std::io::Error> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(&raw).map_err(std::io::Error::from)
}

/// Check a username and password against the loaded users.
pub fn authenticate(users: &[UserEntry], username: &str, password: &str) -> bool {
    users
        .iter()
        .filter(|u| u.username == username)
        .any(|u| password_matches(password, &u.password))
}

fn password_matches(password: &str, stored: &str) -> bool {
    if !stored.starts_with("$argon2") {
        return stored == password;
    }
    match PasswordHash::new(stored) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Malformed password hash in users file");
            false
        }
    }
}
