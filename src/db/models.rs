use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored door-access request.
///
/// Text columns are kept as plain strings: admin edits are written back
/// without re-validation, so the table may hold values the intake flow
/// would have rejected.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Request {
    pub id: i64,
    pub site_id: String,
    pub surname: String,
    pub phone: String,
    pub status: String,
    pub date: String,
    pub time: String,
    pub submitter_id: i64,
}

/// A fully validated request produced by the intake flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequest {
    pub site_id: String,
    pub surname: String,
    pub phone: String,
    pub status: DoorStatus,
}

/// Admin replacement of the four mutable fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequestUpdate {
    pub site_id: String,
    pub surname: String,
    pub phone: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorStatus {
    Open,
    Close,
}

impl DoorStatus {
    /// Case-sensitive: only the literal button labels are accepted.
    pub fn from_choice(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "close" => Some(Self::Close),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// Dashboard role claim.
///
/// `User` actors are scoped to requests whose `surname` equals their login
/// name. Technicians must therefore type exactly their dashboard username as
/// the surname during intake for their requests to be visible to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Which rows a listing may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    All,
    /// Only rows whose `surname` matches exactly.
    Surname(String),
}

/// Optional dashboard filters; every supplied one must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestFilter {
    pub site_id: Option<String>,
    pub status: Option<String>,
    /// Inclusive, `YYYY-MM-DD`
    pub date_from: Option<chrono::NaiveDate>,
    pub date_to: Option<chrono::NaiveDate>,
}
