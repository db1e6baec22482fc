//! Update router: the single ingress turning chat events into handler calls.
//!
//! Every event runs as its own task under a deadline. A failing or panicking
//! handler is logged and answered with a generic message; the loop itself
//! only stops on shutdown or when the event channel closes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::catalog::Direction;
use super::{expect_state, Handler, Keyboards};
use crate::callback::{Callback, CallbackData};
use crate::chat::Event;
use crate::dialogue::TextInput;
use crate::domain::Customer;
use crate::errors::{BotError, BotResult, CallbackError};

/// Text commands, typed or sent by the bottom keyboard
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Menu,
    Cart,
    AddPosition,
}

impl Command {
    pub fn parse(text: &str, keyboards: &Keyboards) -> Option<Self> {
        let text = text.trim();
        match text {
            "/start" => Some(Command::Start),
            "/menu" => Some(Command::Menu),
            "/cart" => Some(Command::Cart),
            "/add" => Some(Command::AddPosition),
            _ if text == keyboards.menu_label => Some(Command::Menu),
            _ if text == keyboards.cart_label => Some(Command::Cart),
            _ if text == keyboards.add_position_label => Some(Command::AddPosition),
            _ => None,
        }
    }
}

/// Routes one event: loads (or registers) the customer, then picks the
/// handler from the command, the decoded callback or the customer's state
pub async fn dispatch(handler: &Handler, event: &Event) -> BotResult<()> {
    let customer = handler.load_customer(event.sender()).await?;
    match event {
        Event::Text { chat_id, text, .. } => route_text(handler, *chat_id, &customer, text).await,
        Event::Callback {
            chat_id,
            message_id,
            data,
            ..
        } => route_callback(handler, *chat_id, &customer, data, *message_id).await,
    }
}

async fn route_text(handler: &Handler, chat_id: i64, customer: &Customer, text: &str) -> BotResult<()> {
    if let Some(command) = Command::parse(text, &handler.keyboards) {
        debug!(user_id = %chat_id, ?command, "Routing command");
        return match command {
            Command::Start => handler.start(chat_id, customer).await,
            Command::Menu => handler.menu(chat_id, customer).await,
            Command::Cart => handler.get_cart(chat_id, customer).await,
            Command::AddPosition => handler.add_position(chat_id, customer).await,
        };
    }

    let input = customer.state.text_input().ok_or(BotError::NoHandler)?;
    debug!(user_id = %chat_id, state = ?customer.state, ?input, "Routing free text");
    match input {
        TextInput::Size => handler.handle_size(chat_id, customer, text).await,
        TextInput::Price => handler.handle_price(chat_id, customer, text).await,
        TextInput::Link => handler.handle_link(chat_id, customer, text).await,
        TextInput::CalculatorAmount => handler.calculator_input(chat_id, customer, text).await,
        TextInput::FullName => handler.handle_full_name(chat_id, customer, text).await,
        TextInput::PhoneNumber => handler.handle_phone_number(chat_id, customer, text).await,
        TextInput::DeliveryAddress => handler.handle_delivery_address(chat_id, customer, text).await,
    }
}

async fn route_callback(
    handler: &Handler,
    chat_id: i64,
    customer: &Customer,
    raw: &str,
    message_id: Option<i32>,
) -> BotResult<()> {
    let data = CallbackData::decode(raw)?;
    let callback = Callback::from_code(data.code).ok_or_else(|| CallbackError::InvalidCode(data.code.to_string()))?;
    debug!(user_id = %chat_id, ?callback, "Routing callback");

    if let Some(required) = callback.required_state() {
        expect_state(customer, required)?;
    }

    match callback {
        Callback::Catalog => handler.catalog(chat_id, customer).await,
        Callback::CatalogPrev => {
            handler
                .catalog_step(chat_id, customer, Direction::Prev, data.message_ids(), message_id)
                .await
        }
        Callback::CatalogNext => {
            handler
                .catalog_step(chat_id, customer, Direction::Next, data.message_ids(), message_id)
                .await
        }
        Callback::MakeOrder | Callback::AddPosition => handler.add_position(chat_id, customer).await,
        Callback::GetCart => handler.get_cart(chat_id, customer).await,
        Callback::EditCart => handler.edit_cart(chat_id, customer).await,
        Callback::RemovePosition(index) => handler.remove_position(chat_id, customer, index, message_id).await,
        Callback::MyOrders => handler.my_orders(chat_id, customer).await,
        Callback::GuideStep(step) => handler.guide_step(chat_id, step, data.message_ids(), message_id).await,
        Callback::OrderType(order_type) => handler.handle_order_type(chat_id, customer, order_type).await,
        Callback::Location(location) => handler.handle_location(chat_id, customer, location).await,
        Callback::Category(category) => handler.handle_category(chat_id, customer, category).await,
        Callback::Button(button) => handler.handle_button(chat_id, customer, button).await,
        Callback::Calculator | Callback::CalculateMore => handler.calculator(chat_id, customer).await,
        Callback::CalculatorOrderType(order_type) => {
            handler.calculator_order_type(chat_id, customer, order_type).await
        }
        Callback::CalculatorLocation(location) => handler.calculator_location(chat_id, customer, location).await,
        Callback::CalculatorCategory(category) => handler.calculator_category(chat_id, customer, category).await,
        Callback::Checkout => handler.checkout(chat_id, customer).await,
        Callback::Paid => handler.paid(chat_id, customer, data.text()).await,
        Callback::Faq => handler.faq(chat_id).await,
        Callback::FaqAnswer(index) => handler.faq_answer(chat_id, index).await,
        Callback::Menu => handler.menu(chat_id, customer).await,
    }
}

/// Runs one dispatch under the deadline and reports its failure to the user
async fn run_dispatch(handler: Arc<Handler>, event: Event, timeout: Duration) {
    let chat_id = event.chat_id();
    let result = match tokio::time::timeout(timeout, dispatch(&handler, &event)).await {
        Ok(result) => result,
        Err(_) => Err(BotError::Timeout),
    };

    if let Err(err) = result {
        if matches!(err, BotError::Timeout) {
            warn!(user_id = %chat_id, timeout_ms = timeout.as_millis() as u64, "Handler timed out");
        } else if err.is_recoverable() {
            warn!(user_id = %chat_id, error = %err, "Update dropped");
        } else {
            error!(user_id = %chat_id, error = %err, "Error in handler occurred");
        }
        handler.handle_error(chat_id, &err).await;
    }
}

pub struct Router {
    handler: Arc<Handler>,
    events: mpsc::Receiver<Event>,
    shutdown: watch::Receiver<bool>,
    handler_timeout: Duration,
}

impl Router {
    pub fn new(
        handler: Arc<Handler>,
        events: mpsc::Receiver<Event>,
        shutdown: watch::Receiver<bool>,
        handler_timeout: Duration,
    ) -> Self {
        Self {
            handler,
            events,
            shutdown,
            handler_timeout,
        }
    }

    /// Consumes events until shutdown is signalled (or its sender dropped)
    /// or the event channel closes, then waits for in-flight dispatches
    pub async fn run(mut self) {
        info!("Router is listening for updates");
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("Router is shutting down");
                        break;
                    }
                }
                event = self.events.recv() => {
                    let Some(event) = event else {
                        info!("Event channel closed");
                        break;
                    };
                    debug!(user_id = %event.sender().id, "New update");
                    tasks.spawn(run_dispatch(Arc::clone(&self.handler), event, self.handler_timeout));
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Dispatch task panicked");
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Dispatch task panicked");
            }
        }
        info!("Router stopped");
    }
}
