//! Telegram front end for the Peramos weather report.
//!
//! Long-polls the Bot API, routes commands, and answers anything that is not
//! a known command with the cached station report.

pub mod bot;
pub mod commands;
pub mod status;
pub mod telegram;

pub use bot::{Bot, Dispatcher};
pub use commands::Command;
pub use status::MemoryProbe;
pub use telegram::{Chat, Message, TelegramClient, Update, User};
