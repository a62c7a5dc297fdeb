use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::Session;

use crate::auth::Actor;
use crate::db::models::Role;
use crate::error::DashboardError;

pub const USER_KEY: &str = "user";
pub const ROLE_KEY: &str = "role";

/// The logged-in actor, read from the session. Handlers that take this
/// extractor redirect to the login page when there is no session.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Actor);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = DashboardError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| anyhow::anyhow!("session layer missing: {}", msg))?;

        let username: Option<String> = session.get(USER_KEY).await.map_err(anyhow::Error::from)?;
        let role: Option<Role> = session.get(ROLE_KEY).await.map_err(anyhow::Error::from)?;

        match (username, role) {
            (Some(username), Some(role)) => Ok(Self(Actor { username, role })),
            _ => Err(DashboardError::Unauthenticated),
        }
    }
}

/// Start a fresh session carrying the actor's claims.
pub async fn sign_in(session: &Session, actor: &Actor) -> Result<(), DashboardError> {
    session.cycle_id().await.map_err(anyhow::Error::from)?;
    session
        .insert(USER_KEY, &actor.username)
        .await
        .map_err(anyhow::Error::from)?;
    session
        .insert(ROLE_KEY, actor.role)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(())
}

pub async fn sign_out(session: &Session) -> Result<(), DashboardError> {
    session.flush().await.map_err(anyhow::Error::from)?;
    Ok(())
}
