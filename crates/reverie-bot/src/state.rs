//! Shared application context passed to every handler.

use reverie_store::SqliteStore;

use crate::dialogue::Dialogues;
use crate::telegram::TelegramClient;

pub struct AppContext {
    pub telegram: TelegramClient,
    pub store: SqliteStore,
    pub dialogues: Dialogues,
}
