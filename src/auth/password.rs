use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Passwords longer than this many bytes are cut down before hashing and
/// verification, so both sides always see the same input.
pub const MAX_PASSWORD_BYTES: usize = 71;

/// Longest prefix of `password` that fits in [`MAX_PASSWORD_BYTES`] without
/// splitting a UTF-8 character.
pub fn truncate_password(password: &str) -> &str {
    if password.len() <= MAX_PASSWORD_BYTES {
        return password;
    }
    let mut end = MAX_PASSWORD_BYTES;
    while !password.is_char_boundary(end) {
        end -= 1;
    }
    &password[..end]
}

/// Hash with Argon2id and a fresh random salt, returning a PHC string.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(truncate_password(password).as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// A malformed stored hash never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("Stored password hash is malformed: {}", e);
            return false;
        }
    };
    Argon2::default()
        .verify_password(truncate_password(password).as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_password_hashes_differently_but_both_verify() {
        let h1 = hash_password("s3cret").unwrap();
        let h2 = hash_password("s3cret").unwrap();

        assert_ne!(h1, h2);
        assert!(verify_password("s3cret", &h1));
        assert!(verify_password("s3cret", &h2));
        assert!(!verify_password("S3cret", &h1));
    }

    #[test]
    fn hash_is_not_plaintext() {
        let hash = hash_password("admin").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("admin"));
    }

    #[test]
    fn long_passwords_are_truncated_consistently() {
        let base = "a".repeat(MAX_PASSWORD_BYTES);
        let hash = hash_password(&format!("{}tail-one", base)).unwrap();

        assert!(verify_password(&format!("{}tail-two", base), &hash));
        assert!(verify_password(&base, &hash));
        assert!(!verify_password(&base[..MAX_PASSWORD_BYTES - 1], &hash));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 'ж' is two bytes; 36 of them span 72 bytes.
        let password = "ж".repeat(36);
        let cut = truncate_password(&password);
        assert_eq!(cut.len(), 70);
        assert_eq!(cut.chars().count(), 35);

        assert_eq!(truncate_password("short"), "short");
    }

    #[test]
    fn malformed_hash_does_not_verify() {
        assert!(!verify_password("admin", "admin"));
        assert!(!verify_password("admin", ""));
    }
}
