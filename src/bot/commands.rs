use std::sync::Arc;
use teloxide::macros::BotCommands;
use teloxide::prelude::*;
use teloxide::types::KeyboardRemove;
use teloxide::utils::command::BotCommands as _;

use crate::bot::handlers::send_reply;
use crate::bot::AppState;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum BotCommand {
    #[command(description = "Start a new door request")]
    Start,
    #[command(description = "Abandon the request in progress")]
    Cancel,
    #[command(description = "Show help")]
    Help,
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: BotCommand,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let chat_id = msg.chat.id;

    match cmd {
        BotCommand::Start => {
            let reply = state.intake.restart(chat_id.0);
            send_reply(&bot, chat_id, reply).await?;
        }

        BotCommand::Cancel => {
            let text = if state.intake.cancel(chat_id.0) {
                tracing::debug!("Chat {} cancelled its intake", chat_id.0);
                "❎ Request cancelled. Send any message to start a new one."
            } else {
                "Nothing to cancel. Send any message to start a request."
            };
            bot.send_message(chat_id, text)
                .reply_markup(KeyboardRemove::new())
                .await?;
        }

        BotCommand::Help => {
            bot.send_message(chat_id, BotCommand::descriptions().to_string())
                .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_lists_every_command() {
        let help = BotCommand::descriptions().to_string();
        for line in ["/start", "/cancel", "/help"] {
            assert!(help.contains(line), "{help}");
        }
    }
}
