//! # Callback Codec
//!
//! Inline buttons carry at most 64 bytes of data back to the bot. This module
//! packs navigation context into that budget and recovers it losslessly.
//!
//! ## Wire format
//!
//! ```text
//! <code>                    bare code, no payload (no ':' anywhere)
//! m<id>,<id>,...:<code>     message id list
//! s<text>:<code>            free-form string
//! ```
//!
//! Decoding splits on the last `:`, so a string payload may itself contain
//! colons.
//!
//! ## Code bands
//!
//! Plain actions are enumerated from 1. Codes that carry an index live in
//! reserved, non-overlapping bands above them:
//!
//! | band           | range          |
//! |----------------|----------------|
//! | remove position| `[1000, 1200)` |
//! | catalog nav    | `[1200, 1400)` |
//! | FAQ answer     | `[1400, 2400)` |

use std::fmt::Write;
use std::ops::Range;

use crate::dialogue::State;
use crate::domain::{Button, Category, Location, OrderType};
use crate::errors::CallbackError;

/// Telegram's limit on `callback_data`
pub const MAX_CALLBACK_DATA_LEN: usize = 64;

const MESSAGE_IDS_MARKER: char = 'm';
const STRING_MARKER: char = 's';
const CODE_SEPARATOR: char = ':';

pub const REMOVE_POSITION_BAND: Range<i32> = 1000..1200;
pub const CATALOG_BAND: Range<i32> = 1200..1400;
pub const FAQ_BAND: Range<i32> = 1400..2400;

/// Most cart lines that can each get a removal button
pub const MAX_CART_POSITIONS: usize = (REMOVE_POSITION_BAND.end - REMOVE_POSITION_BAND.start) as usize;
/// Most FAQ entries that can each get an answer button
pub const MAX_FAQ_ENTRIES: usize = (FAQ_BAND.end - FAQ_BAND.start) as usize;

pub const CATALOG_PREV: i32 = 1200;
pub const CATALOG_NEXT: i32 = 1201;

/// Extra data attached to a button next to its code
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    None,
    MessageIds(Vec<i32>),
    Text(String),
}

/// A decoded `callback_data` value
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackData {
    pub code: i32,
    pub payload: Payload,
}

impl CallbackData {
    pub fn bare(code: i32) -> Self {
        Self {
            code,
            payload: Payload::None,
        }
    }

    pub fn with_message_ids(code: i32, ids: Vec<i32>) -> Self {
        Self {
            code,
            payload: Payload::MessageIds(ids),
        }
    }

    pub fn with_text(code: i32, text: impl Into<String>) -> Self {
        Self {
            code,
            payload: Payload::Text(text.into()),
        }
    }

    pub fn message_ids(&self) -> &[i32] {
        match &self.payload {
            Payload::MessageIds(ids) => ids,
            _ => &[],
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Serializes to the wire format, refusing anything over the size limit
    pub fn encode(&self) -> Result<String, CallbackError> {
        let mut out = String::new();
        match &self.payload {
            Payload::None => {}
            Payload::MessageIds(ids) => {
                out.push(MESSAGE_IDS_MARKER);
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{id}");
                }
                out.push(CODE_SEPARATOR);
            }
            Payload::Text(text) => {
                out.push(STRING_MARKER);
                out.push_str(text);
                out.push(CODE_SEPARATOR);
            }
        }
        let _ = write!(out, "{}", self.code);

        if out.len() > MAX_CALLBACK_DATA_LEN {
            return Err(CallbackError::TooLong(out.len()));
        }
        Ok(out)
    }

    pub fn decode(raw: &str) -> Result<Self, CallbackError> {
        if raw.is_empty() {
            return Err(CallbackError::Empty);
        }

        let Some((body, code)) = raw.rsplit_once(CODE_SEPARATOR) else {
            return Ok(Self::bare(parse_code(raw)?));
        };
        let code = parse_code(code)?;

        let mut chars = body.chars();
        let payload = match chars.next() {
            Some(MESSAGE_IDS_MARKER) => Payload::MessageIds(parse_message_ids(chars.as_str())?),
            Some(STRING_MARKER) => Payload::Text(chars.as_str().to_string()),
            _ => return Err(CallbackError::MissingPrefix(raw.to_string())),
        };

        Ok(Self { code, payload })
    }
}

fn parse_code(raw: &str) -> Result<i32, CallbackError> {
    raw.parse::<i32>()
        .map_err(|_| CallbackError::InvalidCode(raw.to_string()))
}

fn parse_message_ids(raw: &str) -> Result<Vec<i32>, CallbackError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|field| {
            field
                .parse::<i32>()
                .map_err(|_| CallbackError::InvalidMessageId(field.to_string()))
        })
        .collect()
}

/// Every button action the bot understands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Callback {
    Catalog,
    MakeOrder,
    GetCart,
    MyOrders,
    /// Order guide step, 1 to 4
    GuideStep(u8),
    AddPosition,
    OrderType(OrderType),
    Location(Location),
    Category(Category),
    Button(Button),
    Calculator,
    CalculatorOrderType(OrderType),
    CalculatorLocation(Location),
    CalculatorCategory(Category),
    EditCart,
    Checkout,
    Faq,
    Menu,
    CalculateMore,
    /// "I paid"; the order short id travels as a string payload
    Paid,
    /// Zero-based cart line index
    RemovePosition(usize),
    CatalogPrev,
    CatalogNext,
    /// Zero-based FAQ entry index
    FaqAnswer(usize),
}

const BASE_CODES: [Callback; 35] = [
    Callback::Catalog,
    Callback::MakeOrder,
    Callback::GetCart,
    Callback::MyOrders,
    Callback::GuideStep(1),
    Callback::GuideStep(2),
    Callback::GuideStep(3),
    Callback::GuideStep(4),
    Callback::AddPosition,
    Callback::OrderType(OrderType::Express),
    Callback::OrderType(OrderType::Normal),
    Callback::Location(Location::SaintPetersburg),
    Callback::Location(Location::Izhevsk),
    Callback::Location(Location::Other),
    Callback::Category(Category::Light),
    Callback::Category(Category::Heavy),
    Callback::Category(Category::Other),
    Callback::Button(Button::Turquoise),
    Callback::Button(Button::Grey),
    Callback::Button(Button::Used95),
    Callback::Calculator,
    Callback::CalculatorOrderType(OrderType::Express),
    Callback::CalculatorOrderType(OrderType::Normal),
    Callback::CalculatorLocation(Location::SaintPetersburg),
    Callback::CalculatorLocation(Location::Izhevsk),
    Callback::CalculatorLocation(Location::Other),
    Callback::CalculatorCategory(Category::Light),
    Callback::CalculatorCategory(Category::Heavy),
    Callback::CalculatorCategory(Category::Other),
    Callback::EditCart,
    Callback::Checkout,
    Callback::Faq,
    Callback::Menu,
    Callback::CalculateMore,
    Callback::Paid,
];

impl Callback {
    /// Resolves a decoded integer, band first, then the base enumeration
    pub fn from_code(code: i32) -> Option<Self> {
        if REMOVE_POSITION_BAND.contains(&code) {
            return Some(Callback::RemovePosition((code - REMOVE_POSITION_BAND.start) as usize));
        }
        if CATALOG_BAND.contains(&code) {
            return match code {
                CATALOG_PREV => Some(Callback::CatalogPrev),
                CATALOG_NEXT => Some(Callback::CatalogNext),
                _ => None,
            };
        }
        if FAQ_BAND.contains(&code) {
            return Some(Callback::FaqAnswer((code - FAQ_BAND.start) as usize));
        }
        if code < 1 {
            return None;
        }
        BASE_CODES.get((code - 1) as usize).copied()
    }

    /// Fails for an indexed action whose index would leave its band
    pub fn code(self) -> Result<i32, CallbackError> {
        match self {
            Callback::RemovePosition(index) => band_code(REMOVE_POSITION_BAND, index),
            Callback::CatalogPrev => Ok(CATALOG_PREV),
            Callback::CatalogNext => Ok(CATALOG_NEXT),
            Callback::FaqAnswer(index) => band_code(FAQ_BAND, index),
            base => Ok(BASE_CODES
                .iter()
                .position(|c| *c == base)
                .map(|i| i as i32 + 1)
                .unwrap_or(0)),
        }
    }

    /// The conversation step a button is only valid in, if it is step-bound
    pub fn required_state(self) -> Option<State> {
        match self {
            Callback::OrderType(_) => Some(State::WaitingForOrderType),
            Callback::Location(_) => Some(State::WaitingForLocation),
            Callback::Category(_) => Some(State::WaitingForCategory),
            Callback::Button(_) => Some(State::WaitingForButton),
            Callback::CalculatorOrderType(_) => Some(State::WaitingForCalculatorOrderType),
            Callback::CalculatorLocation(_) => Some(State::WaitingForCalculatorLocation),
            Callback::CalculatorCategory(_) => Some(State::WaitingForCalculatorCategory),
            Callback::RemovePosition(_) => Some(State::WaitingForCartPositionToEdit),
            _ => None,
        }
    }

    pub fn data(self) -> Result<CallbackData, CallbackError> {
        Ok(CallbackData::bare(self.code()?))
    }
}

fn band_code(band: Range<i32>, index: usize) -> Result<i32, CallbackError> {
    if index >= band.len() {
        return Err(CallbackError::IndexOutOfBand(index));
    }
    Ok(band.start + index as i32)
}
