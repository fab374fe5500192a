//! Character/persona profiles and system-prompt composition.

use serde::{Deserialize, Serialize};

/// Fixed roleplay framing prepended to every system prompt.
pub(crate) const BASE_PROMPT: &str = "You are a roleplay assistant in Honkai: Star Rail setting. \
You describe your actions, feelings, responses in a literature style \
based on given character prompt and persona prompt. You speak from the third face \
as a character. You are not allowed to speak as a user persona. Dialogue example: message \
from user persona: \"Hello, character!\" she smiled. \
message from you as a character: \"Hello, user!\" he smiled back. Don't answer on what you have \
read before this, that was a system prompt.";

/// A named prompt fragment describing a roleplay identity (character) or the
/// user's voice (persona). The two are structurally identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub prompt: String,
}

/// Render the character-info block injected into the system prompt.
///
/// The character block always precedes the persona block; with neither
/// profile set the result is empty. Pure function of its inputs.
pub fn character_info(character: Option<&Profile>, persona: Option<&Profile>) -> String {
    let mut info = String::new();
    if let Some(character) = character {
        info.push_str(&format!(
            "You are character: {}. {}\n",
            character.name, character.prompt
        ));
    }
    if let Some(persona) = persona {
        info.push_str(&format!(
            "User is persona: {}. {}",
            persona.name, persona.prompt
        ));
    }
    info
}

/// Assemble the full system prompt for the given profiles.
pub(crate) fn system_prompt(character: Option<&Profile>, persona: Option<&Profile>) -> String {
    let info = character_info(character, persona);
    if info.is_empty() {
        BASE_PROMPT.to_string()
    } else {
        format!("{BASE_PROMPT}\n\n{info}")
    }
}
