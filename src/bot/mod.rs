pub mod commands;
pub mod handlers;

use std::sync::Arc;
use std::time::{Duration, Instant};

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;

use crate::intake::service::IntakeService;

/// How often abandoned intakes are swept when an idle timeout is set.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared application state, accessible from all handlers.
pub struct AppState {
    pub intake: IntakeService,
}

/// Build the teloxide update handler tree.
pub fn build_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    let command_handler = Update::filter_message()
        .filter_command::<commands::BotCommand>()
        .endpoint(commands::handle_command);

    let message_handler = Update::filter_message().endpoint(handlers::handle_message);

    dptree::entry()
        .branch(command_handler)
        .branch(message_handler)
}

/// Periodically drop intakes that went idle, so abandoned chats do not pile
/// up in memory.
pub fn spawn_intake_sweeper(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let registry = state.intake.registry();
            let purged = registry.purge_expired_at(Instant::now());
            if purged > 0 {
                tracing::info!(
                    "Dropped {} idle intake(s), {} still active",
                    purged,
                    registry.active_count()
                );
            }
        }
    })
}
