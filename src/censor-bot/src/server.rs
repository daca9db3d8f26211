//! Telegram dispatcher setup and routing

use crate::handlers::{self, Command};
use crate::state::BotState;
use censor_engine::{replies, Dialogue};
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Poll Telegram and route updates until Ctrl+C
pub async fn serve(bot: Bot, state: BotState) -> anyhow::Result<()> {
    let handler = Update::filter_message()
        // Commands: /start, /help, /censor, /cancel
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handlers::command),
        )
        // Photos
        .branch(dptree::filter(|msg: Message| msg.photo().is_some()).endpoint(handlers::photo))
        // Phrases
        .branch(dptree::filter(|msg: Message| handlers::is_phrase(&msg)).endpoint(handlers::text));

    let me = bot.get_me().await?;
    info!("starting censor bot as @{}", me.username());

    let sweeper = state.session_timeout.map(|timeout| {
        info!("idle sessions expire after {}s", timeout.as_secs());
        tokio::spawn(expire_sessions(bot.clone(), Arc::clone(&state.dialogue), timeout))
    });

    // Updates from one chat are handled in order, different chats concurrently
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    info!("dispatcher stopped");
    Ok(())
}

/// Periodically end idle sessions and tell their users
async fn expire_sessions(bot: Bot, dialogue: Arc<Dialogue>, timeout: Duration) {
    let mut ticker = tokio::time::interval(sweep_period(timeout));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        for id in dialogue.expire_idle(timeout).await {
            // Sessions come from private chats, whose id is the user's id
            let chat = ChatId(id.0 as i64);
            if let Err(e) = bot.send_message(chat, replies::TIMED_OUT).await {
                warn!(user = %id, "failed to send timeout notice: {}", e);
            }
        }
    }
}

/// How often to look for idle sessions
fn sweep_period(timeout: Duration) -> Duration {
    (timeout / 4).clamp(Duration::from_secs(1), Duration::from_secs(60))
}
