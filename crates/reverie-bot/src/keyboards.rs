//! Keyboard layouts and callback-data naming.

use reverie_store::{ProfileKind, ProfileRecord};

use crate::telegram::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, ReplyKeyboardMarkup, ReplyMarkup,
};

/// Persistent main menu shown under the input field.
pub fn main_keyboard() -> ReplyMarkup {
    ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
        keyboard: vec![
            vec![KeyboardButton {
                text: "New Chat".into(),
            }],
            vec![KeyboardButton {
                text: "Options".into(),
            }],
        ],
        resize_keyboard: true,
        input_field_placeholder: Some("Choose an option".into()),
    })
}

/// Yes/No prompt shown when starting a new chat.
pub fn change_options() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![
            InlineKeyboardButton::new("Yes", "Yes"),
            InlineKeyboardButton::new("No", "No"),
        ]],
    }
}

/// Top-level options menu.
pub fn options() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![
                InlineKeyboardButton::new("Characters", "Characters"),
                InlineKeyboardButton::new("Personas", "Personas"),
            ],
            vec![InlineKeyboardButton::new("Change API", "Change_API")],
        ],
    }
}

/// Select/create/delete menu for one profile kind.
pub fn profile_options(kind: ProfileKind) -> InlineKeyboardMarkup {
    let label = kind.label();
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![
                InlineKeyboardButton::new(format!("Select a {label}"), select_menu_data(kind)),
                InlineKeyboardButton::new(format!("Create a {label}"), create_data(kind)),
            ],
            vec![InlineKeyboardButton::new(
                format!("Delete a {label}"),
                delete_menu_data(kind),
            )],
        ],
    }
}

/// One button per saved profile; deletion lists carry the ❌ prefix and
/// delete callbacks instead of select callbacks.
pub fn profile_list(
    kind: ProfileKind,
    profiles: &[ProfileRecord],
    for_deletion: bool,
) -> InlineKeyboardMarkup {
    let inline_keyboard = profiles
        .iter()
        .map(|profile| {
            let (text, data) = if for_deletion {
                (
                    format!("❌ {}", profile.name),
                    format!("{}{}", delete_prefix(kind), profile.id),
                )
            } else {
                (
                    profile.name.clone(),
                    format!("{}{}", select_prefix(kind), profile.id),
                )
            };
            vec![InlineKeyboardButton::new(text, data)]
        })
        .collect();
    InlineKeyboardMarkup { inline_keyboard }
}

pub fn create_data(kind: ProfileKind) -> &'static str {
    match kind {
        ProfileKind::Character => "Create_Character",
        ProfileKind::Persona => "Create_Persona",
    }
}

pub fn select_menu_data(kind: ProfileKind) -> &'static str {
    match kind {
        ProfileKind::Character => "Change_Character",
        ProfileKind::Persona => "Change_Persona",
    }
}

pub fn delete_menu_data(kind: ProfileKind) -> &'static str {
    match kind {
        ProfileKind::Character => "Delete_Character",
        ProfileKind::Persona => "Delete_Persona",
    }
}

pub fn select_prefix(kind: ProfileKind) -> &'static str {
    match kind {
        ProfileKind::Character => "select_char_",
        ProfileKind::Persona => "select_persona_",
    }
}

pub fn delete_prefix(kind: ProfileKind) -> &'static str {
    match kind {
        ProfileKind::Character => "delete_char_",
        ProfileKind::Persona => "delete_persona_",
    }
}
