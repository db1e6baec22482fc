//! Conversation state module: the closed set of dialogue steps, the table
//! deciding which free-text input each step accepts, and the validators for
//! that input.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// One point in the conversation with a customer.
///
/// The discriminants are the persisted representation. Only equality carries
/// meaning, never ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum State {
    #[default]
    Default = 0,
    WaitingForOrderType = 1,
    WaitingForLocation = 2,
    WaitingForCategory = 3,
    WaitingForSize = 4,
    WaitingForButton = 5,
    WaitingForPrice = 6,
    WaitingForLink = 7,
    WaitingForCartPositionToEdit = 8,
    WaitingForCalculatorOrderType = 9,
    WaitingForCalculatorLocation = 10,
    WaitingForCalculatorCategory = 11,
    WaitingForCalculatorInput = 12,
    WaitingForFullName = 13,
    WaitingForPhoneNumber = 14,
    WaitingForDeliveryAddress = 15,
}

impl State {
    pub const ALL: [State; 16] = [
        State::Default,
        State::WaitingForOrderType,
        State::WaitingForLocation,
        State::WaitingForCategory,
        State::WaitingForSize,
        State::WaitingForButton,
        State::WaitingForPrice,
        State::WaitingForLink,
        State::WaitingForCartPositionToEdit,
        State::WaitingForCalculatorOrderType,
        State::WaitingForCalculatorLocation,
        State::WaitingForCalculatorCategory,
        State::WaitingForCalculatorInput,
        State::WaitingForFullName,
        State::WaitingForPhoneNumber,
        State::WaitingForDeliveryAddress,
    ];

    /// The free-text handler legal in this state, if any.
    ///
    /// Steps that are answered with buttons (order type, location, category,
    /// button colour, cart edit) have no text handler.
    pub fn text_input(self) -> Option<TextInput> {
        match self {
            State::WaitingForSize => Some(TextInput::Size),
            State::WaitingForPrice => Some(TextInput::Price),
            State::WaitingForLink => Some(TextInput::Link),
            State::WaitingForCalculatorInput => Some(TextInput::CalculatorAmount),
            State::WaitingForFullName => Some(TextInput::FullName),
            State::WaitingForPhoneNumber => Some(TextInput::PhoneNumber),
            State::WaitingForDeliveryAddress => Some(TextInput::DeliveryAddress),
            _ => None,
        }
    }
}

impl From<State> for i16 {
    fn from(state: State) -> Self {
        state as i16
    }
}

impl TryFrom<i16> for State {
    type Error = StoreError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        State::ALL
            .into_iter()
            .find(|s| *s as i16 == value)
            .ok_or_else(|| StoreError::Corrupted(format!("unknown conversation state {value}")))
    }
}

/// Kinds of free-text input the conversation collects
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextInput {
    Size,
    Price,
    Link,
    CalculatorAmount,
    FullName,
    PhoneNumber,
    DeliveryAddress,
}

lazy_static! {
    static ref PHONE_NUMBER: Regex = Regex::new(r"^\+?7\d{10}$").expect("phone pattern should be valid");
}

const MAX_SIZE_LEN: usize = 32;
const MAX_ADDRESS_LEN: usize = 255;

/// Validates a position size. `#` stands for "no size".
pub fn validate_size(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err("size-invalid");
    }

    if trimmed.chars().count() > MAX_SIZE_LEN {
        return Err("size-invalid");
    }

    Ok(trimmed.to_string())
}

/// Largest shop price accepted, in yuan
pub const MAX_PRICE_YUAN: u64 = 10_000_000;

/// Parses a positive whole amount in yuan, at most [`MAX_PRICE_YUAN`]
pub fn parse_price(input: &str) -> Result<u64, &'static str> {
    match input.trim().parse::<u64>() {
        Ok(price) if (1..=MAX_PRICE_YUAN).contains(&price) => Ok(price),
        _ => Err("price-invalid"),
    }
}

pub fn validate_link(input: &str, pattern: &Regex) -> Result<String, &'static str> {
    let trimmed = input.trim();
    if pattern.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err("link-invalid")
    }
}

/// A full name is exactly three space separated words: surname, name, patronymic.
pub fn validate_full_name(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim();
    let tokens: Vec<&str> = trimmed.split(' ').collect();

    if tokens.len() != 3 || tokens.iter().any(|t| t.is_empty()) {
        return Err("fullname-invalid");
    }

    Ok(trimmed.to_string())
}

/// Returns the number without the optional leading `+`
pub fn validate_phone_number(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim();
    if !PHONE_NUMBER.is_match(trimmed) {
        return Err("phone-invalid");
    }
    Ok(trimmed.trim_start_matches('+').to_string())
}

pub fn validate_delivery_address(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim();

    if trimmed.is_empty() || trimmed.chars().count() > MAX_ADDRESS_LEN {
        return Err("address-invalid");
    }

    Ok(trimmed.to_string())
}
