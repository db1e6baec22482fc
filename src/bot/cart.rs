//! Cart preview and in-place editing

use tracing::debug;

use super::ui_builder::{edit_cart_buttons, format_cart};
use super::Handler;
use crate::chat::Keyboard;
use crate::dialogue::State;
use crate::domain::Customer;
use crate::errors::BotResult;
use crate::store::CustomerUpdate;

impl Handler {
    pub async fn get_cart(&self, chat_id: i64, customer: &Customer) -> BotResult<()> {
        if customer.cart.is_empty() {
            self.send(chat_id, "cart-empty").await?;
            return Ok(());
        }

        let text = format_cart(&self.texts, &customer.cart);
        self.chat
            .send_text(chat_id, &text, Some(self.keyboards.cart_preview()))
            .await?;
        Ok(())
    }

    pub async fn edit_cart(&self, chat_id: i64, customer: &Customer) -> BotResult<()> {
        if customer.cart.is_empty() {
            self.send(chat_id, "cart-empty").await?;
            return Ok(());
        }

        let buttons = edit_cart_buttons(&self.texts, &customer.cart)?;
        self.store
            .update_state(customer.telegram_id, State::WaitingForCartPositionToEdit)
            .await?;
        self.send_with_keyboard(chat_id, "cart-choose-position", Keyboard::Inline(buttons))
            .await?;
        Ok(())
    }

    /// Removes the line behind a "remove position N" button and re-renders
    /// the buttons of that message
    pub async fn remove_position(
        &self,
        chat_id: i64,
        customer: &Customer,
        index: usize,
        message_id: Option<i32>,
    ) -> BotResult<()> {
        let mut cart = customer.cart.clone();
        match cart.get(index).map(|p| p.position_id) {
            Some(position_id) => {
                cart.remove(position_id);
            }
            None => debug!(user_id = %customer.telegram_id, index, "Stale remove button, cart unchanged"),
        }

        let mut update = CustomerUpdate::new().cart(cart.clone());
        if cart.is_empty() {
            update = update.state(State::Default);
        }
        self.store.update_customer(customer.telegram_id, update).await?;

        if cart.is_empty() {
            if let Some(message_id) = message_id {
                self.chat.delete_message(chat_id, message_id).await?;
            }
            self.send(chat_id, "cart-now-empty").await?;
            return Ok(());
        }

        let buttons = edit_cart_buttons(&self.texts, &cart)?;
        match message_id {
            Some(message_id) => self.chat.edit_message_buttons(chat_id, message_id, buttons).await?,
            None => {
                self.send_with_keyboard(chat_id, "cart-choose-position", Keyboard::Inline(buttons))
                    .await?;
            }
        }
        Ok(())
    }
}
