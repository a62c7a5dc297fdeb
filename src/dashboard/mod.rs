//! Role-scoped access to stored requests.
//!
//! Admins see and change everything. Plain users only ever read rows whose
//! surname equals their login name, whatever filters they pass.

use crate::auth::{self, Actor};
use crate::db::models::{ListScope, Request, RequestFilter, RequestUpdate, Role};
use crate::db::Database;
use crate::error::DashboardError;

#[derive(Debug, Clone)]
pub struct DashboardService {
    db: Database,
}

impl DashboardService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Actor, DashboardError> {
        match auth::authenticate(&self.db, username, password).await? {
            Some(actor) => {
                tracing::info!("User '{}' logged in as {}", actor.username, actor.role.as_str());
                Ok(actor)
            }
            None => {
                tracing::info!("Failed login attempt for '{}'", username);
                Err(DashboardError::InvalidCredentials)
            }
        }
    }

    pub async fn list(
        &self,
        actor: &Actor,
        filter: &RequestFilter,
    ) -> Result<Vec<Request>, DashboardError> {
        let scope = match actor.role {
            Role::Admin => ListScope::All,
            Role::User => ListScope::Surname(actor.username.clone()),
        };
        Ok(self.db.list_requests(&scope, filter).await?)
    }

    /// Unknown ids are ignored.
    pub async fn edit(
        &self,
        actor: &Actor,
        id: i64,
        update: &RequestUpdate,
    ) -> Result<(), DashboardError> {
        require_admin(actor)?;
        if self.db.update_request(id, update).await? {
            tracing::info!("Request #{} edited by {}", id, actor.username);
        } else {
            tracing::debug!("Edit of missing request #{} ignored", id);
        }
        Ok(())
    }

    /// Unknown ids are ignored.
    pub async fn delete(&self, actor: &Actor, id: i64) -> Result<(), DashboardError> {
        require_admin(actor)?;
        if self.db.delete_request(id).await? {
            tracing::info!("Request #{} deleted by {}", id, actor.username);
        } else {
            tracing::debug!("Delete of missing request #{} ignored", id);
        }
        Ok(())
    }

    /// Every stored row, for the CSV and spreadsheet downloads.
    pub async fn export(&self, actor: &Actor) -> Result<Vec<Request>, DashboardError> {
        require_admin(actor)?;
        Ok(self.db.all_requests().await?)
    }
}

fn require_admin(actor: &Actor) -> Result<(), DashboardError> {
    if actor.role.is_admin() {
        Ok(())
    } else {
        tracing::warn!("User '{}' attempted an admin-only operation", actor.username);
        Err(DashboardError::Forbidden)
    }
}
