//! Conversational intake of a door-access request.
//!
//! A chat walks through four stages, one inbound message per step:
//! site id, surname, phone, door status. Invalid input is answered with a
//! [`Rejection`] and leaves the state untouched. The final stage yields a
//! complete [`NewRequest`]; nothing is written anywhere before that.

pub mod registry;
pub mod service;

use std::sync::LazyLock;

use regex::Regex;

use crate::db::models::{DoorStatus, NewRequest};

static SITE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5}$").expect("site id pattern compiles"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\+7|8)[0-9]{10}$").expect("phone pattern compiles"));

pub fn is_valid_site_id(input: &str) -> bool {
    SITE_ID_RE.is_match(input)
}

pub fn is_valid_phone(input: &str) -> bool {
    PHONE_RE.is_match(input)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitingSiteId,
    AwaitingSurname,
    AwaitingPhone,
    AwaitingStatus,
}

/// Why an input did not advance the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    SiteId,
    Surname,
    Phone,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Input rejected, stage unchanged.
    Rejected(Rejection),
    /// Field stored, now waiting in the given stage.
    Advanced(Stage),
    /// All four fields collected.
    Completed(NewRequest),
}

/// Partial request for one chat. Each stage carries exactly the fields
/// collected before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IntakeState {
    #[default]
    AwaitingSiteId,
    AwaitingSurname {
        site_id: String,
    },
    AwaitingPhone {
        site_id: String,
        surname: String,
    },
    AwaitingStatus {
        site_id: String,
        surname: String,
        phone: String,
    },
}

impl IntakeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::AwaitingSiteId => Stage::AwaitingSiteId,
            Self::AwaitingSurname { .. } => Stage::AwaitingSurname,
            Self::AwaitingPhone { .. } => Stage::AwaitingPhone,
            Self::AwaitingStatus { .. } => Stage::AwaitingStatus,
        }
    }

    /// Feed one inbound message. `None` stands for a non-text message, which
    /// no stage accepts.
    pub fn accept(&mut self, input: Option<&str>) -> Transition {
        let text = input.unwrap_or("");
        let next = match self {
            Self::AwaitingSiteId => {
                if !is_valid_site_id(text) {
                    return Transition::Rejected(Rejection::SiteId);
                }
                Self::AwaitingSurname {
                    site_id: text.to_string(),
                }
            }
            Self::AwaitingSurname { site_id } => {
                if text.trim().is_empty() {
                    return Transition::Rejected(Rejection::Surname);
                }
                Self::AwaitingPhone {
                    site_id: site_id.clone(),
                    surname: text.to_string(),
                }
            }
            Self::AwaitingPhone { site_id, surname } => {
                if !is_valid_phone(text) {
                    return Transition::Rejected(Rejection::Phone);
                }
                Self::AwaitingStatus {
                    site_id: site_id.clone(),
                    surname: surname.clone(),
                    phone: text.to_string(),
                }
            }
            Self::AwaitingStatus {
                site_id,
                surname,
                phone,
            } => {
                let Some(status) = DoorStatus::from_choice(text) else {
                    return Transition::Rejected(Rejection::Status);
                };
                // The state stays put; the caller clears it once the record
                // is safely stored.
                return Transition::Completed(NewRequest {
                    site_id: site_id.clone(),
                    surname: surname.clone(),
                    phone: phone.clone(),
                    status,
                });
            }
        };
        *self = next;
        Transition::Advanced(self.stage())
    }
}
