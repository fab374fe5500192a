//! Update routing: commands, dialogue text, and callback queries.
//!
//! Flow failures are swallowed at the top level: the error is logged and the
//! user gets an apology line, never a crash of the poll loop.

use tracing::warn;

use reverie_ai::{ChatSession, Profile};
use reverie_store::{ProfileKind, ProfileRecord, StoreError};

use crate::dialogue::{route_text, DialogueState, TextAction};
use crate::keyboards;
use crate::state::AppContext;
use crate::telegram::{CallbackQuery, ReplyMarkup, TelegramError, TgMessage, TgUser, Update};

const API_KEY_PROMPT: &str = "Please, send me your Google Gemini API-key to proceed.";
const STORY_PROMPT: &str = "You are free to set your story. Please, consider creating a \
new character and persona for a better experience.";
const APOLOGY: &str = "Ah, it seems something is wrong. My apologies. Please, try again later.";
const CALLBACK_APOLOGY: &str = "It seems something is wrong. Please, try again later.";

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error(transparent)]
    Telegram(#[from] TelegramError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Entry point for one polled update.
pub async fn handle_update(ctx: &AppContext, update: Update) {
    if let Some(message) = update.message {
        let chat_id = message.chat.id;
        if let Err(err) = handle_message(ctx, &message).await {
            warn!(%err, chat_id, "message handling failed");
            let _ = ctx.telegram.send_message(chat_id, APOLOGY).await;
        }
    } else if let Some(callback) = update.callback_query {
        let callback_id = callback.id.clone();
        if let Err(err) = handle_callback(ctx, &callback).await {
            warn!(%err, "callback handling failed");
            let _ = ctx
                .telegram
                .answer_callback_query(&callback_id, Some(CALLBACK_APOLOGY), false)
                .await;
        }
    }
}

async fn handle_message(ctx: &AppContext, message: &TgMessage) -> Result<(), BotError> {
    let (Some(from), Some(text)) = (message.from.as_ref(), message.text.as_deref()) else {
        return Ok(());
    };
    let chat_id = message.chat.id;

    match text {
        "/start" => cmd_start(ctx, from, chat_id).await,
        "/status" => cmd_status(ctx, from, chat_id).await,
        "New Chat" => {
            ctx.telegram
                .send_message_with_markup(
                    chat_id,
                    "Would you like to change persona or character?",
                    &ReplyMarkup::Inline(keyboards::change_options()),
                )
                .await?;
            Ok(())
        }
        "Options" => {
            ctx.telegram
                .send_message_with_markup(
                    chat_id,
                    "Select an option:",
                    &ReplyMarkup::Inline(keyboards::options()),
                )
                .await?;
            Ok(())
        }
        _ => handle_text(ctx, from, chat_id, text).await,
    }
}

async fn cmd_start(ctx: &AppContext, from: &TgUser, chat_id: i64) -> Result<(), BotError> {
    ctx.store.ensure_user(from.id)?;

    let name = match &from.last_name {
        Some(last) => format!("{} {}", from.first_name, last),
        None => from.first_name.clone(),
    };
    ctx.telegram
        .send_message(
            chat_id,
            &format!(
                "My sincerest greetings, {name}. I am Sunday. It is an honour for me to \
                 help you delve into yet another Trailblaze within Honkai: Star Rail universe."
            ),
        )
        .await?;

    if ctx.store.api_key(from.id)?.is_none() {
        ctx.telegram.send_message(chat_id, API_KEY_PROMPT).await?;
        ctx.dialogues.entry(from.id).await.lock().await.state = DialogueState::AwaitingApiKey;
    } else {
        ctx.telegram
            .send_message_with_markup(chat_id, STORY_PROMPT, &keyboards::main_keyboard())
            .await?;
    }
    Ok(())
}

async fn cmd_status(ctx: &AppContext, from: &TgUser, chat_id: i64) -> Result<(), BotError> {
    let entry = ctx.dialogues.entry(from.id).await;
    let user = entry.lock().await;

    let mut lines = Vec::new();
    if let Some(persona) = &user.active_persona {
        lines.push(format!("Active persona: {}", persona.name));
    }
    if let Some(character) = &user.active_character {
        lines.push(format!("Active character: {}", character.name));
    }
    if lines.is_empty() {
        lines.push("No active persona or character selected.".to_string());
    }

    ctx.telegram
        .send_message(chat_id, &lines.join("\n"))
        .await?;
    Ok(())
}

/// Free text: either a dialogue-state step or a roleplay message.
async fn handle_text(
    ctx: &AppContext,
    from: &TgUser,
    chat_id: i64,
    text: &str,
) -> Result<(), BotError> {
    let entry = ctx.dialogues.entry(from.id).await;
    let mut user = entry.lock().await;

    match route_text(&mut user, text) {
        TextAction::RegisterKey(key) => {
            if !reverie_ai::validate_key(&key).await {
                ctx.telegram
                    .send_message(
                        chat_id,
                        "Ah, it seems like the key you have sent is not corrent. \
                         Please, try again.",
                    )
                    .await?;
                return Ok(());
            }
            ctx.store.set_api_key(from.id, &key)?;
            user.state = DialogueState::Idle;
            ctx.telegram
                .send_message(chat_id, "New API-key has been saved.")
                .await?;
            ctx.telegram
                .send_message_with_markup(chat_id, STORY_PROMPT, &keyboards::main_keyboard())
                .await?;
        }
        TextAction::AskProfilePrompt { kind } => {
            let ask = match kind {
                ProfileKind::Character => {
                    "Now, please, describe your character as if you speak with them. \
                     For example: \"You are 27 years old, you have got blue eyes and \
                     brown hair, you are kind and sweet.\" You may also add some \
                     background and biography."
                }
                ProfileKind::Persona => {
                    "Now, please, describe your persona as if you talk about yourself."
                }
            };
            ctx.telegram.send_message(chat_id, ask).await?;
        }
        TextAction::SaveProfile { kind, name, prompt } => {
            ctx.store.add_profile(kind, from.id, &name, &prompt)?;
            ctx.telegram
                .send_message(chat_id, &format!("New {} has been saved.", kind.label()))
                .await?;
        }
        TextAction::Converse(text) => {
            if user.active_character.is_none() || user.active_persona.is_none() {
                let hint = missing_profile_hint(
                    user.active_character.is_some(),
                    user.active_persona.is_some(),
                );
                ctx.telegram.send_message(chat_id, hint).await?;
                return Ok(());
            }

            if user.chat.is_none() {
                let Some(api_key) = ctx.store.api_key(from.id)? else {
                    user.state = DialogueState::AwaitingApiKey;
                    ctx.telegram.send_message(chat_id, API_KEY_PROMPT).await?;
                    return Ok(());
                };
                user.chat = Some(ChatSession::new(
                    api_key,
                    user.active_character.clone(),
                    user.active_persona.clone(),
                ));
            }
            let Some(chat) = user.chat.as_mut() else {
                return Ok(());
            };

            let reply = chat.get_response(text).await;
            ctx.telegram.send_message(chat_id, &reply).await?;
        }
    }
    Ok(())
}

fn missing_profile_hint(has_character: bool, has_persona: bool) -> &'static str {
    match (has_character, has_persona) {
        (false, true) => "Please, select a character first.",
        (true, false) => "Please, select a persona first.",
        _ => "Please, select a persona and a character first.",
    }
}

fn title(kind: ProfileKind) -> &'static str {
    match kind {
        ProfileKind::Character => "Character",
        ProfileKind::Persona => "Persona",
    }
}

fn to_profile(record: &ProfileRecord) -> Profile {
    Profile {
        id: record.id,
        name: record.name.clone(),
        prompt: record.prompt.clone(),
    }
}

async fn handle_callback(ctx: &AppContext, callback: &CallbackQuery) -> Result<(), BotError> {
    let Some(data) = callback.data.as_deref() else {
        return Ok(());
    };
    let Some(message) = callback.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat.id;
    let message_id = message.message_id;

    match data {
        "Yes" => {
            ctx.telegram
                .answer_callback_query(&callback.id, Some("Change"), false)
                .await?;
            ctx.telegram
                .edit_message_text(
                    chat_id,
                    message_id,
                    "Select an option:",
                    Some(&keyboards::options()),
                )
                .await?;
            Ok(())
        }
        "No" => keep_profiles_new_chat(ctx, callback, chat_id, message_id).await,
        "Characters" => {
            ctx.telegram
                .edit_message_text(
                    chat_id,
                    message_id,
                    "Select an option:",
                    Some(&keyboards::profile_options(ProfileKind::Character)),
                )
                .await?;
            Ok(())
        }
        "Personas" => {
            ctx.telegram
                .edit_message_text(
                    chat_id,
                    message_id,
                    "Select an option:",
                    Some(&keyboards::profile_options(ProfileKind::Persona)),
                )
                .await?;
            Ok(())
        }
        "Change_API" => {
            ctx.telegram
                .edit_message_text(chat_id, message_id, API_KEY_PROMPT, None)
                .await?;
            ctx.dialogues
                .entry(callback.from.id)
                .await
                .lock()
                .await
                .state = DialogueState::AwaitingApiKey;
            Ok(())
        }
        "Create_Character" => create_profile_start(ctx, callback, chat_id, ProfileKind::Character).await,
        "Create_Persona" => create_profile_start(ctx, callback, chat_id, ProfileKind::Persona).await,
        "Change_Character" => {
            select_profile_start(ctx, callback, chat_id, message_id, ProfileKind::Character).await
        }
        "Change_Persona" => {
            select_profile_start(ctx, callback, chat_id, message_id, ProfileKind::Persona).await
        }
        "Delete_Character" => {
            delete_profile_start(ctx, callback, chat_id, message_id, ProfileKind::Character).await
        }
        "Delete_Persona" => {
            delete_profile_start(ctx, callback, chat_id, message_id, ProfileKind::Persona).await
        }
        other => {
            for kind in [ProfileKind::Character, ProfileKind::Persona] {
                if let Some(id) = other.strip_prefix(keyboards::select_prefix(kind)) {
                    return select_profile(ctx, callback, chat_id, kind, id).await;
                }
                if let Some(id) = other.strip_prefix(keyboards::delete_prefix(kind)) {
                    return delete_profile(ctx, callback, chat_id, message_id, kind, id).await;
                }
            }
            Ok(())
        }
    }
}

/// "No" on the new-chat prompt: keep the active profiles, start over with a
/// fresh session (empty history).
async fn keep_profiles_new_chat(
    ctx: &AppContext,
    callback: &CallbackQuery,
    chat_id: i64,
    message_id: i64,
) -> Result<(), BotError> {
    ctx.telegram
        .answer_callback_query(&callback.id, Some("Leave it be"), false)
        .await?;

    let entry = ctx.dialogues.entry(callback.from.id).await;
    let mut user = entry.lock().await;

    if user.active_character.is_none() || user.active_persona.is_none() {
        let hint = missing_profile_hint(
            user.active_character.is_some(),
            user.active_persona.is_some(),
        );
        ctx.telegram
            .edit_message_text(chat_id, message_id, hint, None)
            .await?;
        return Ok(());
    }

    let Some(api_key) = ctx.store.api_key(callback.from.id)? else {
        user.state = DialogueState::AwaitingApiKey;
        ctx.telegram
            .edit_message_text(chat_id, message_id, API_KEY_PROMPT, None)
            .await?;
        return Ok(());
    };

    user.chat = Some(ChatSession::new(
        api_key,
        user.active_character.clone(),
        user.active_persona.clone(),
    ));
    ctx.telegram
        .edit_message_text(chat_id, message_id, "You may now start a fresh chat.", None)
        .await?;
    Ok(())
}

async fn create_profile_start(
    ctx: &AppContext,
    callback: &CallbackQuery,
    chat_id: i64,
    kind: ProfileKind,
) -> Result<(), BotError> {
    ctx.telegram
        .answer_callback_query(&callback.id, Some(&format!("Create {}", title(kind))), false)
        .await?;
    ctx.telegram
        .send_message(
            chat_id,
            &format!("Please, set a name for a {}.", kind.label()),
        )
        .await?;
    ctx.dialogues
        .entry(callback.from.id)
        .await
        .lock()
        .await
        .state = DialogueState::AwaitingProfileName { kind };
    Ok(())
}

async fn select_profile_start(
    ctx: &AppContext,
    callback: &CallbackQuery,
    chat_id: i64,
    message_id: i64,
    kind: ProfileKind,
) -> Result<(), BotError> {
    ctx.telegram
        .answer_callback_query(&callback.id, Some(&format!("Change {}", title(kind))), false)
        .await?;

    let profiles = ctx.store.profiles(kind, callback.from.id)?;
    if profiles.is_empty() {
        ctx.telegram
            .edit_message_text(
                chat_id,
                message_id,
                &format!(
                    "It seems you have not created any {}s yet. \
                     Please, proceed with creating one.",
                    kind.label()
                ),
                None,
            )
            .await?;
        return Ok(());
    }

    ctx.telegram
        .edit_message_text(
            chat_id,
            message_id,
            &format!("Select a {}:", kind.label()),
            Some(&keyboards::profile_list(kind, &profiles, false)),
        )
        .await?;
    Ok(())
}

async fn select_profile(
    ctx: &AppContext,
    callback: &CallbackQuery,
    chat_id: i64,
    kind: ProfileKind,
    raw_id: &str,
) -> Result<(), BotError> {
    let Ok(profile_id) = raw_id.parse::<i64>() else {
        ctx.telegram
            .answer_callback_query(&callback.id, Some(CALLBACK_APOLOGY), false)
            .await?;
        return Ok(());
    };

    let profiles = ctx.store.profiles(kind, callback.from.id)?;
    let Some(selected) = profiles.iter().find(|profile| profile.id == profile_id) else {
        ctx.telegram
            .answer_callback_query(
                &callback.id,
                Some(&format!("{} not found!", title(kind))),
                false,
            )
            .await?;
        return Ok(());
    };

    let preview: String = selected.prompt.chars().take(100).collect();
    ctx.telegram
        .send_message(
            chat_id,
            &format!(
                "Selected {}: {}\nDescription: {preview}...",
                kind.label(),
                selected.name
            ),
        )
        .await?;

    let entry = ctx.dialogues.entry(callback.from.id).await;
    let mut user = entry.lock().await;
    match kind {
        ProfileKind::Character => user.active_character = Some(to_profile(selected)),
        ProfileKind::Persona => user.active_persona = Some(to_profile(selected)),
    }
    // One session per pairing: a new selection discards the live chat.
    user.chat = None;
    drop(user);

    ctx.telegram
        .answer_callback_query(
            &callback.id,
            Some(&format!("{} '{}' is now active!", title(kind), selected.name)),
            false,
        )
        .await?;
    Ok(())
}

async fn delete_profile_start(
    ctx: &AppContext,
    callback: &CallbackQuery,
    chat_id: i64,
    message_id: i64,
    kind: ProfileKind,
) -> Result<(), BotError> {
    ctx.telegram
        .answer_callback_query(&callback.id, Some(&format!("Delete {}", title(kind))), false)
        .await?;
    render_delete_list(ctx, callback, chat_id, message_id, kind).await
}

async fn render_delete_list(
    ctx: &AppContext,
    callback: &CallbackQuery,
    chat_id: i64,
    message_id: i64,
    kind: ProfileKind,
) -> Result<(), BotError> {
    let profiles = ctx.store.profiles(kind, callback.from.id)?;
    if profiles.is_empty() {
        ctx.telegram
            .edit_message_text(
                chat_id,
                message_id,
                &format!("You have no {}s to delete.", kind.label()),
                None,
            )
            .await?;
        return Ok(());
    }

    ctx.telegram
        .edit_message_text(
            chat_id,
            message_id,
            &format!("Select {} to delete:", kind.label()),
            Some(&keyboards::profile_list(kind, &profiles, true)),
        )
        .await?;
    Ok(())
}

async fn delete_profile(
    ctx: &AppContext,
    callback: &CallbackQuery,
    chat_id: i64,
    message_id: i64,
    kind: ProfileKind,
    raw_id: &str,
) -> Result<(), BotError> {
    let Ok(profile_id) = raw_id.parse::<i64>() else {
        ctx.telegram
            .answer_callback_query(&callback.id, Some(CALLBACK_APOLOGY), true)
            .await?;
        return Ok(());
    };

    if ctx
        .store
        .delete_profile(kind, callback.from.id, profile_id)?
    {
        ctx.telegram
            .answer_callback_query(
                &callback.id,
                Some(&format!("{} deleted successfully!", title(kind))),
                true,
            )
            .await?;
        render_delete_list(ctx, callback, chat_id, message_id, kind).await
    } else {
        ctx.telegram
            .answer_callback_query(
                &callback.id,
                Some(&format!("{} not found or deletion failed.", title(kind))),
                true,
            )
            .await?;
        Ok(())
    }
}
