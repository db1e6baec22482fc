//! Bot module: the conversation handlers and the router feeding them
//!
//! This module is split into several submodules:
//! - `router`: consumes inbound events and dispatches them to handlers
//! - `menu`: start, menu, FAQ and order history
//! - `position`: delivery parameters and the per-position sub-flow
//! - `cart`: cart preview and editing
//! - `checkout`: full name, phone, address, order creation and payment
//! - `catalog`: catalog browsing
//! - `calculator`: standalone price estimation
//! - `guide`: the step-by-step ordering guide
//! - `ui_builder`: keyboards and message formatting

pub mod calculator;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod guide;
pub mod menu;
pub mod position;
pub mod router;
pub mod ui_builder;

use std::sync::Arc;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{error, info};

use crate::catalog::CatalogCache;
use crate::chat::{ChatClient, Keyboard, Sender};
use crate::config::BotSettings;
use crate::dialogue::State;
use crate::domain::{make_username, Customer};
use crate::errors::{BotError, BotResult, StoreError};
use crate::localization::Texts;
use crate::pricing::PricingEngine;
use crate::store::Store;

pub use router::{dispatch, Command, Router};
pub use ui_builder::Keyboards;

/// Everything a conversation handler needs, constructed once at startup
pub struct Handler {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) chat: Arc<dyn ChatClient>,
    pub(crate) catalog: Arc<CatalogCache>,
    pub(crate) pricing: PricingEngine,
    pub(crate) texts: Arc<Texts>,
    pub(crate) keyboards: Keyboards,
    pub(crate) settings: Arc<BotSettings>,
    pub(crate) link_pattern: Regex,
}

impl Handler {
    pub fn new(
        store: Arc<dyn Store>,
        chat: Arc<dyn ChatClient>,
        catalog: Arc<CatalogCache>,
        pricing: PricingEngine,
        texts: Arc<Texts>,
        settings: Arc<BotSettings>,
    ) -> Result<Self> {
        let keyboards = Keyboards::new(&texts, &settings).context("Failed to build keyboards")?;
        let link_pattern =
            Regex::new(&settings.shop_link_pattern).context("shop_link_pattern is not a valid regex")?;

        Ok(Self {
            store,
            chat,
            catalog,
            pricing,
            texts,
            keyboards,
            settings,
            link_pattern,
        })
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn keyboards(&self) -> &Keyboards {
        &self.keyboards
    }

    /// Loads the customer behind an event, registering them on first contact
    pub async fn load_customer(&self, sender: &Sender) -> BotResult<Customer> {
        match self.store.get_customer(sender.id).await {
            Ok(customer) => Ok(customer),
            Err(StoreError::CustomerNotFound(_)) => {
                let username = make_username(
                    &sender.first_name,
                    sender.last_name.as_deref(),
                    sender.username.as_deref(),
                );
                info!(user_id = %sender.id, username = %username, "Registering new customer");
                let customer = Customer::new(sender.id, username);
                self.store.save_customer(&customer).await?;
                Ok(customer)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) async fn send(&self, chat_id: i64, key: &str) -> BotResult<i32> {
        Ok(self.chat.send_text(chat_id, &self.texts.get(key), None).await?)
    }

    pub(crate) async fn send_with_keyboard(&self, chat_id: i64, key: &str, keyboard: Keyboard) -> BotResult<i32> {
        Ok(self
            .chat
            .send_text(chat_id, &self.texts.get(key), Some(keyboard))
            .await?)
    }

    /// Answers a failed dispatch with the generic message. Never fails itself.
    pub async fn handle_error(&self, chat_id: i64, err: &BotError) {
        if let Err(e) = self
            .chat
            .send_text(chat_id, &self.texts.get("error-generic"), None)
            .await
        {
            error!(user_id = %chat_id, error = %e, dispatch_error = %err, "Failed to report error to user");
        }
    }
}

/// Rejects the update when the customer is not in the expected step
pub fn expect_state(customer: &Customer, expected: State) -> BotResult<()> {
    if customer.state != expected {
        return Err(BotError::InvalidState {
            expected,
            actual: customer.state,
        });
    }
    Ok(())
}
