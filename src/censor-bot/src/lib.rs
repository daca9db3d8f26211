//! Censor Telegram transport - commands, photo uploads and replies

pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use error::BotError;
pub use handlers::Command;
pub use server::serve;
pub use state::BotState;

pub use teloxide::Bot;
