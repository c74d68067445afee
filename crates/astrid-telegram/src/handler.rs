//! Update handling and dispatcher wiring.
//!
//! Every inbound Telegram message becomes one
//! [`astrid_mediator::InboundMessage`] run straight through
//! [`Mediator::handle_inbound`] — there is no session map, approval
//! manager, or elicitation state here; the Mediator owns all of that.

use std::sync::Arc;

use astrid_core::Scope;
use astrid_mediator::{AgentDispatcher, InboundMessage, Mediator, MediatorOutcome};
use astrid_totp::TotpDaemonClient;
use teloxide::prelude::*;
use teloxide::types::{Message, ParseMode};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{TelegramResult, user_facing_message};
use crate::format::{chunk_html, md_to_telegram_html};

/// Shared state handed to every update handler.
pub struct BotState<D> {
    mediator: Mediator<D>,
    dispatcher: Arc<dyn AgentDispatcher>,
    pool_key: String,
    recipient: String,
}

impl<D: TotpDaemonClient + Send + Sync> BotState<D> {
    /// Build the shared state the dispatcher injects into every handler.
    ///
    /// `pool_key` is the dispatch pool this channel runs through (e.g.
    /// `"telegram:social"`, spec §4.M step 6); `recipient` is the persona
    /// the bot answers as.
    #[must_use]
    pub fn new(mediator: Mediator<D>, dispatcher: Arc<dyn AgentDispatcher>, pool_key: String, recipient: String) -> Self {
        Self { mediator, dispatcher, pool_key, recipient }
    }
}

fn media_ref_of(msg: &Message) -> Option<String> {
    if let Some(photo) = msg.photo() {
        photo.last().map(|size| size.file.id.clone())
    } else {
        msg.document().map(|doc| doc.file.id.clone())
    }
}

async fn handle_message<D>(bot: Bot, msg: Message, state: Arc<BotState<D>>) -> ResponseResult<()>
where
    D: TotpDaemonClient + Send + Sync + 'static,
{
    let Some(body) = msg.text().or_else(|| msg.caption()) else {
        return Ok(());
    };

    let chat_id = msg.chat.id;
    let sender = msg.from.as_ref().map_or_else(|| chat_id.0.to_string(), |user| user.id.0.to_string());

    let inbound = InboundMessage {
        chat_id: chat_id.0.to_string(),
        sender,
        recipient: state.recipient.clone(),
        message_id: msg.id.0.to_string(),
        pool_key: state.pool_key.clone(),
        scope: Scope::Telegram,
        body: body.to_string(),
        media_ref: media_ref_of(&msg),
    };

    let cancel = CancellationToken::new();
    let outcome = state.mediator.handle_inbound(inbound, state.dispatcher.as_ref(), cancel).await;

    let reply_text = match outcome {
        Ok(MediatorOutcome::Dropped) => return Ok(()),
        Ok(MediatorOutcome::Challenge { text }) => text,
        Ok(MediatorOutcome::Dispatched { reply }) => reply,
        Err(err) => {
            warn!(%err, "mediator pipeline returned an error");
            user_facing_message(&err)
        }
    };

    for chunk in chunk_html(&md_to_telegram_html(&reply_text), 0) {
        if let Err(e) = bot.send_message(chat_id, chunk).parse_mode(ParseMode::Html).await {
            warn!(%chat_id, "failed to send reply: {e}");
        }
    }

    Ok(())
}

/// Run the Telegram long-poll dispatcher until cancelled (e.g. ctrl-c).
///
/// # Errors
///
/// Never returns an error today; the `Result` return gives room for
/// startup failures (webhook registration, etc.) without a breaking
/// signature change.
pub async fn run<D>(bot: Bot, state: Arc<BotState<D>>) -> TelegramResult<()>
where
    D: TotpDaemonClient + Send + Sync + 'static,
{
    let handler = Update::filter_message().endpoint(handle_message::<D>);
    Dispatcher::builder(bot, handler)
        .dependencies(teloxide::dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    Ok(())
}
