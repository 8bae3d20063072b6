// Telegram adapter — teloxide dispatcher and the ChatGateway over Bot.
//
// `/start` addressed to this bot gets the greeting; every other message,
// including commands meant for other bots, goes through
// enforcement::handle_message. Long polling, retries and update parsing are
// teloxide's job.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId};
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use crate::enforcement::{self, ChatGateway, IncomingMessage};
use crate::moderation::Moderator;

/// Reply to `/start`.
pub const GREETING: &str = "🛡️ Content Moderator Bot\n\n\
I analyze messages for:\n\
- Toxic language\n\
- Spam links\n\
- Scam content";

/// Commands this bot answers. Parsing checks any `@username` suffix against
/// the bot's own name, so `/start@OtherBot` is not ours.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase")]
enum Command {
    #[command(description = "What this bot checks for")]
    Start(String),
}

/// ChatGateway backed by the Telegram Bot API.
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatGateway for TelegramGateway {
    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .with_context(|| format!("Failed to delete message {message_id} in chat {chat_id}"))?;
        Ok(())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .with_context(|| format!("Failed to send message to chat {chat_id}"))?;
        Ok(())
    }
}

/// Everything a handler needs, injected through dptree.
struct HandlerState {
    moderator: Moderator,
    gateway: TelegramGateway,
    admin_chat_id: Option<i64>,
}

/// Run the bot until Ctrl-C.
pub async fn run(bot: Bot, moderator: Moderator, admin_chat_id: Option<i64>) {
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    let state = Arc::new(HandlerState {
        moderator,
        gateway: TelegramGateway::new(bot.clone()),
        admin_chat_id,
    });

    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(on_command),
        )
        .branch(dptree::endpoint(on_message));

    info!("Starting moderation bot...");

    Dispatcher::builder(bot, handler)
        .default_handler(|_| async {})
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped");
}

async fn on_command(bot: Bot, message: Message, command: Command) -> ResponseResult<()> {
    match command {
        Command::Start(_) => {
            bot.send_message(message.chat.id, GREETING).await?;
        }
    }
    Ok(())
}

async fn on_message(message: Message, state: Arc<HandlerState>) -> ResponseResult<()> {
    let incoming = IncomingMessage {
        chat_id: message.chat.id.0,
        message_id: message.id.0,
        sender_id: message.from.as_ref().map(|user| user.id.0),
        text: message.text().map(str::to_string),
    };

    enforcement::handle_message(
        &state.moderator,
        &state.gateway,
        state.admin_chat_id,
        &incoming,
    )
    .await;

    Ok(())
}
