use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{KeyboardButton, KeyboardMarkup, KeyboardRemove};

use crate::bot::AppState;
use crate::intake::service::Reply;

/// Every non-command message is a step of the intake flow.
pub async fn handle_message(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Channel posts carry no sender to attribute a request to.
    let Some(submitter_id) = msg.from.as_ref().map(|u| u.id.0 as i64) else {
        return Ok(());
    };

    let reply = match state
        .intake
        .handle(msg.chat.id.0, submitter_id, msg.text())
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!("Failed to save request from chat {}: {:#}", msg.chat.id.0, e);
            Reply::save_failed()
        }
    };

    send_reply(&bot, msg.chat.id, reply).await?;
    Ok(())
}

/// Render an intake reply as a Telegram message.
pub async fn send_reply(bot: &Bot, chat_id: ChatId, reply: Reply) -> ResponseResult<()> {
    match reply {
        Reply::Text(text) => {
            bot.send_message(chat_id, text).await?;
        }
        Reply::Choice { text, options } => {
            let buttons: Vec<KeyboardButton> = options.into_iter().map(KeyboardButton::new).collect();
            let keyboard = KeyboardMarkup::new(vec![buttons]).resize_keyboard();
            bot.send_message(chat_id, text)
                .reply_markup(keyboard)
                .await?;
        }
        Reply::Finished(text) => {
            bot.send_message(chat_id, text)
                .reply_markup(KeyboardRemove::new())
                .await?;
        }
    }
    Ok(())
}
