//! Telegram Bot API integration.
//!
//! A hand-rolled client over the HTTPS Bot API (long polling, no webhook)
//! plus serde types for the subset of the Update schema the bot consumes.

mod client;
mod types;

pub use client::{TelegramClient, TelegramError};
pub use types::{
    CallbackQuery, Chat, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton,
    ReplyKeyboardMarkup, ReplyMarkup, TgMessage, TgUser, Update,
};
