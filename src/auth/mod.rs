pub mod password;

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::config::SeedUser;
use crate::db::models::Role;
use crate::db::Database;

/// Identity claims carried by an authenticated dashboard session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub username: String,
    pub role: Role,
}

/// Check a login attempt. `None` covers both an unknown username and a wrong
/// password; callers cannot tell them apart.
pub async fn authenticate(
    db: &Database,
    username: &str,
    candidate: &str,
) -> anyhow::Result<Option<Actor>> {
    let user = db.find_user_by_username(username).await?;

    // Unknown usernames still pay for one verification so response timing
    // does not reveal which accounts exist.
    let (hash, claims) = match user {
        Some(u) => (Some(u.password_hash), Some((u.username, u.role))),
        None => (None, None),
    };

    let candidate = candidate.to_string();
    let ok = tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
        let hash = match &hash {
            Some(h) => h.as_str(),
            None => dummy_hash()?,
        };
        Ok(password::verify_password(&candidate, hash))
    })
    .await??;

    Ok(match (ok, claims) {
        (true, Some((username, role))) => Some(Actor { username, role }),
        _ => None,
    })
}

/// Provision the configured accounts. Existing usernames are left untouched.
/// Also prepares the hash that unknown usernames are checked against, so the
/// first such login costs the same as any other.
pub async fn seed_users(db: &Database, users: &[SeedUser]) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(dummy_hash).await??;

    for seed in users {
        if db.find_user_by_username(&seed.username).await?.is_some() {
            continue;
        }
        let plain = seed.password.clone();
        let hash = tokio::task::spawn_blocking(move || password::hash_password(&plain)).await??;
        if db
            .insert_user_if_absent(&seed.username, &hash, seed.role)
            .await?
        {
            tracing::info!("Seeded {} account '{}'", seed.role.as_str(), seed.username);
        }
    }
    Ok(())
}

static DUMMY_HASH: OnceLock<String> = OnceLock::new();

/// Blocking: the first call runs Argon2.
fn dummy_hash() -> anyhow::Result<&'static str> {
    if let Some(h) = DUMMY_HASH.get() {
        return Ok(h);
    }
    let h = password::hash_password("not-a-real-account")?;
    Ok(DUMMY_HASH.get_or_init(|| h))
}

#[cfg(test)]
pub(crate) fn seed(username: &str, password: &str, role: Role) -> SeedUser {
    SeedUser {
        username: username.to_string(),
        password: password.to_string(),
        role,
    }
}
