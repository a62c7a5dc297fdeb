use std::time::Instant;

use super::registry::{IntakeRegistry, Step};
use super::{Rejection, Stage, Transition};
use crate::db::models::{DoorStatus, NewRequest};
use crate::db::Database;

pub const PROMPT_SITE_ID: &str = "👋 I'm Door_Openbot\nEnter the SITEID (exactly 5 digits):";
pub const PROMPT_SURNAME: &str = "Enter your surname:";
pub const PROMPT_PHONE: &str = "Enter your phone number starting with 8 or +7:";
pub const PROMPT_STATUS: &str = "✅ Press a button:\nopen - door is open\nclose - door is closed";

const ERR_SITE_ID: &str = "❌ Error! Exactly 5 digits are required:";
const ERR_SURNAME: &str = "❌ Surname cannot be empty. Enter your surname:";
const ERR_PHONE: &str = "❌ Invalid phone format\nExample: +77001234567 or 87001234567";
const ERR_STATUS: &str = "❌ Please press one of the buttons: open or close";
const ERR_SAVE: &str = "⚠️ Could not save the request. Press the button again:";

pub const STATUS_CHOICES: [&str; 2] = [DoorStatus::Open.as_str(), DoorStatus::Close.as_str()];

/// What the chat transport should send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// Text with a fixed set of choice buttons.
    Choice {
        text: String,
        options: Vec<&'static str>,
    },
    /// Final text; any choice buttons should be removed.
    Finished(String),
}

impl Reply {
    fn status_choice(text: &str) -> Self {
        Self::Choice {
            text: text.to_string(),
            options: STATUS_CHOICES.to_vec(),
        }
    }

    /// Sent when the final write fails; the intake is still at the status stage.
    pub fn save_failed() -> Self {
        Self::status_choice(ERR_SAVE)
    }
}

/// Drives the intake flow for every chat and persists completed requests.
pub struct IntakeService {
    registry: IntakeRegistry,
    db: Database,
}

impl IntakeService {
    pub fn new(db: Database, registry: IntakeRegistry) -> Self {
        Self { registry, db }
    }

    pub fn registry(&self) -> &IntakeRegistry {
        &self.registry
    }

    /// Handle one inbound message from `submitter_id` in `chat_id`.
    pub async fn handle(
        &self,
        chat_id: i64,
        submitter_id: i64,
        input: Option<&str>,
    ) -> anyhow::Result<Reply> {
        self.handle_at(chat_id, submitter_id, input, Instant::now())
            .await
    }

    pub async fn handle_at(
        &self,
        chat_id: i64,
        submitter_id: i64,
        input: Option<&str>,
        now: Instant,
    ) -> anyhow::Result<Reply> {
        let transition = match self.registry.step_at(chat_id, input, now) {
            Step::Started => return Ok(Reply::Text(PROMPT_SITE_ID.to_string())),
            Step::Moved(t) => t,
        };

        match transition {
            Transition::Rejected(rejection) => {
                tracing::debug!("Chat {} input rejected: {:?}", chat_id, rejection);
                Ok(rejection_reply(rejection))
            }
            Transition::Advanced(stage) => Ok(stage_prompt(stage)),
            Transition::Completed(request) => {
                // On failure the intake stays at the status stage so the
                // user can press the button again.
                let id = self.db.add_request(&request, submitter_id).await?;
                self.registry.clear(chat_id);
                tracing::info!(
                    "Request #{} saved: site {} ({}) from user {}",
                    id,
                    request.site_id,
                    request.status.as_str(),
                    submitter_id
                );
                Ok(Reply::Finished(confirmation(&request)))
            }
        }
    }

    /// `/start`: throw away any partial intake and begin again.
    pub fn restart(&self, chat_id: i64) -> Reply {
        self.registry.restart_at(chat_id, Instant::now());
        Reply::Text(PROMPT_SITE_ID.to_string())
    }

    /// `/cancel`: returns true if an intake was in progress.
    pub fn cancel(&self, chat_id: i64) -> bool {
        self.registry.clear(chat_id)
    }
}

fn stage_prompt(stage: Stage) -> Reply {
    match stage {
        Stage::AwaitingSiteId => Reply::Text(PROMPT_SITE_ID.to_string()),
        Stage::AwaitingSurname => Reply::Text(PROMPT_SURNAME.to_string()),
        Stage::AwaitingPhone => Reply::Text(PROMPT_PHONE.to_string()),
        Stage::AwaitingStatus => Reply::status_choice(PROMPT_STATUS),
    }
}

fn rejection_reply(rejection: Rejection) -> Reply {
    match rejection {
        Rejection::SiteId => Reply::Text(ERR_SITE_ID.to_string()),
        Rejection::Surname => Reply::Text(ERR_SURNAME.to_string()),
        Rejection::Phone => Reply::Text(ERR_PHONE.to_string()),
        Rejection::Status => Reply::status_choice(ERR_STATUS),
    }
}

fn confirmation(req: &NewRequest) -> String {
    format!(
        "✅ Request saved!\nSITEID: {}\nSurname: {}\nPhone: {}\nStatus: {}",
        req.site_id,
        req.surname,
        req.phone,
        req.status.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{ListScope, RequestFilter};
    use crate::db::test_db;

    async fn service() -> IntakeService {
        IntakeService::new(test_db().await, IntakeRegistry::new(None))
    }

    async fn send(svc: &IntakeService, text: &str) -> Reply {
        svc.handle(100, 555, Some(text)).await.unwrap()
    }

    #[tokio::test]
    async fn full_conversation_persists_one_request() {
        let svc = service().await;

        assert_eq!(send(&svc, "hello").await, Reply::Text(PROMPT_SITE_ID.to_string()));
        assert_eq!(send(&svc, "12a45").await, Reply::Text(ERR_SITE_ID.to_string()));
        assert_eq!(send(&svc, "01234").await, Reply::Text(PROMPT_SURNAME.to_string()));
        assert_eq!(send(&svc, "Ivanov").await, Reply::Text(PROMPT_PHONE.to_string()));
        assert_eq!(send(&svc, "7001234567").await, Reply::Text(ERR_PHONE.to_string()));
        assert_eq!(
            send(&svc, "87001234567").await,
            Reply::Choice {
                text: PROMPT_STATUS.to_string(),
                options: vec!["open", "close"],
            }
        );
        assert!(svc.db.all_requests().await.unwrap().is_empty());

        let done = send(&svc, "open").await;
        assert_eq!(
            done,
            Reply::Finished(
                "✅ Request saved!\nSITEID: 01234\nSurname: Ivanov\nPhone: 87001234567\nStatus: open"
                    .to_string()
            )
        );

        let rows = svc.db.all_requests().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].site_id, "01234");
        assert_eq!(rows[0].surname, "Ivanov");
        assert_eq!(rows[0].phone, "87001234567");
        assert_eq!(rows[0].status, "open");
        assert_eq!(rows[0].submitter_id, 555);

        // State is gone: the next message starts over.
        assert_eq!(svc.registry().stage_at(100, Instant::now()), None);
        assert_eq!(send(&svc, "12345").await, Reply::Text(PROMPT_SITE_ID.to_string()));
    }

    #[tokio::test]
    async fn failed_write_keeps_status_stage_for_retry() {
        let svc = service().await;
        for text in ["start", "12345", "Petrov", "+77001234567"] {
            send(&svc, text).await;
        }

        sqlx::query("DROP TABLE requests")
            .execute(&svc.db.pool)
            .await
            .unwrap();
        assert!(svc.handle(100, 555, Some("open")).await.is_err());
        assert_eq!(
            svc.registry().stage_at(100, Instant::now()),
            Some(Stage::AwaitingStatus)
        );
        assert_eq!(
            Reply::save_failed(),
            Reply::Choice {
                text: ERR_SAVE.to_string(),
                options: vec!["open", "close"],
            }
        );

        svc.db.run_migrations().await.unwrap();
        assert!(matches!(send(&svc, "open").await, Reply::Finished(_)));
        let rows = svc.db.all_requests().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].site_id, "12345");
        assert_eq!(rows[0].status, "open");
    }

    #[tokio::test]
    async fn wrong_status_reprompts_with_buttons() {
        let svc = service().await;
        for text in ["start", "12345", "Petrov", "+77001234567"] {
            send(&svc, text).await;
        }

        assert_eq!(
            send(&svc, "maybe").await,
            Reply::Choice {
                text: ERR_STATUS.to_string(),
                options: vec!["open", "close"],
            }
        );
        assert!(svc.db.all_requests().await.unwrap().is_empty());
        assert_eq!(
            svc.registry().stage_at(100, Instant::now()),
            Some(Stage::AwaitingStatus)
        );
    }

    #[tokio::test]
    async fn cancel_discards_partial_input() {
        let svc = service().await;
        for text in ["start", "12345", "Petrov"] {
            send(&svc, text).await;
        }

        assert!(svc.cancel(100));
        assert!(!svc.cancel(100));
        assert_eq!(send(&svc, "+77001234567").await, Reply::Text(PROMPT_SITE_ID.to_string()));

        let all = svc
            .db
            .list_requests(&ListScope::All, &RequestFilter::default())
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn restart_begins_at_site_id() {
        let svc = service().await;
        for text in ["start", "12345"] {
            send(&svc, text).await;
        }
        assert_eq!(svc.restart(100), Reply::Text(PROMPT_SITE_ID.to_string()));
        assert_eq!(
            svc.registry().stage_at(100, Instant::now()),
            Some(Stage::AwaitingSiteId)
        );
    }

    #[tokio::test]
    async fn non_text_message_is_rejected_mid_flow() {
        let svc = service().await;
        send(&svc, "start").await;
        assert_eq!(
            svc.handle(100, 555, None).await.unwrap(),
            Reply::Text(ERR_SITE_ID.to_string())
        );
    }
}
