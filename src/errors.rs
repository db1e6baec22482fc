//! # Error Types Module
//!
//! Error taxonomy for the order-taking conversation. Every failure a single
//! dispatch can produce is one of these; the router logs it and answers the
//! customer with a generic message, it never tears the router loop down.

use thiserror::Error;
use uuid::Uuid;

use crate::dialogue::State;

/// Failures while decoding or encoding inline button payloads
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    #[error("empty callback data")]
    Empty,
    /// A payload was present (`:` found) but the marker byte is unknown
    #[error("unknown payload marker in {0:?}")]
    MissingPrefix(String),
    #[error("invalid callback code {0:?}")]
    InvalidCode(String),
    #[error("invalid message id {0:?} in payload")]
    InvalidMessageId(String),
    #[error("callback data is {0} bytes, limit is 64")]
    TooLong(usize),
    /// An indexed action whose index does not fit its code band
    #[error("index {0} does not fit its callback band")]
    IndexOutOfBand(usize),
}

/// Failures of the price formula resolution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("yuan rate is unavailable: {0}")]
    RateUnavailable(String),
    #[error("order type is not selected")]
    MissingOrderType,
    #[error("location is not selected")]
    MissingLocation,
    #[error("category is not selected")]
    MissingCategory,
    #[error("price {0} is out of range")]
    OutOfRange(f64),
}

/// Failures of the persistent store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("customer {0} not found")]
    CustomerNotFound(i64),
    #[error("order {0} not found")]
    OrderNotFound(String),
    #[error("catalog item {0} not found")]
    ItemNotFound(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupted record: {0}")]
    Corrupted(String),
}

impl StoreError {
    pub fn item_not_found(item_id: Uuid) -> Self {
        StoreError::ItemNotFound(item_id.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::CustomerNotFound(_) | StoreError::OrderNotFound(_) | StoreError::ItemNotFound(_)
        )
    }
}

/// Failures of the chat transport
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),
    #[error("invalid media url {0:?}")]
    InvalidUrl(String),
}

/// Errors surfaced by a single dispatch
#[derive(Debug, Error)]
pub enum BotError {
    #[error("invalid state: expected {expected:?}, customer is in {actual:?}")]
    InvalidState { expected: State, actual: State },
    #[error("handler not found")]
    NoHandler,
    #[error("invalid update")]
    InvalidUpdate,
    #[error("handler timed out")]
    Timeout,
    #[error(transparent)]
    Callback(#[from] CallbackError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Chat(#[from] ChatError),
}

impl BotError {
    /// Store and transport failures abandon the dispatch; everything else is
    /// an expected outcome of talking to a human.
    pub fn is_recoverable(&self) -> bool {
        match self {
            BotError::Store(e) => e.is_not_found(),
            BotError::Chat(_) | BotError::Timeout => false,
            _ => true,
        }
    }
}

pub type BotResult<T> = Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_formatting() {
        let err = BotError::InvalidState {
            expected: State::WaitingForSize,
            actual: State::Default,
        };
        assert_eq!(
            err.to_string(),
            "invalid state: expected WaitingForSize, customer is in Default"
        );

        let err = BotError::from(CallbackError::InvalidCode("x1".to_string()));
        assert_eq!(err.to_string(), "invalid callback code \"x1\"");
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(BotError::NoHandler.is_recoverable());
        assert!(BotError::from(StoreError::CustomerNotFound(1)).is_recoverable());
        assert!(!BotError::from(StoreError::Corrupted("state".into())).is_recoverable());
        assert!(!BotError::Timeout.is_recoverable());
    }
}
