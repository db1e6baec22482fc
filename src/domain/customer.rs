use serde::{Deserialize, Serialize};

use super::{Cart, Meta, PositionDraft};
use crate::dialogue::State;

/// A chat user going through the ordering conversation.
///
/// Keyed by the chat-native numeric id. Created on first contact and never
/// deleted by the bot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub telegram_id: i64,
    pub username: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub state: State,
    pub cart: Cart,
    pub meta: Meta,
    pub calculator_meta: Meta,
    pub catalog_offset: usize,
    pub last_edit_position: Option<PositionDraft>,
}

impl Customer {
    pub fn new(telegram_id: i64, username: impl Into<String>) -> Self {
        Self {
            telegram_id,
            username: username.into(),
            full_name: None,
            phone_number: None,
            state: State::Default,
            cart: Cart::new(),
            meta: Meta::default(),
            calculator_meta: Meta::default(),
            catalog_offset: 0,
            last_edit_position: None,
        }
    }

    /// Full name when known, chat username otherwise
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }
}

/// Builds the display name stored for a new customer
pub fn make_username(first_name: &str, last_name: Option<&str>, username: Option<&str>) -> String {
    if let Some(username) = username.filter(|u| !u.is_empty()) {
        return username.to_string();
    }
    match last_name.filter(|l| !l.is_empty()) {
        Some(last_name) => format!("{first_name} {last_name}"),
        None => first_name.to_string(),
    }
}
