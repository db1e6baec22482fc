//! Checkout: full name -> phone number -> delivery address -> order, then
//! payment confirmation

use tracing::{error, info, warn};

use super::ui_builder::{format_order_preview, paid_buttons};
use super::Handler;
use crate::chat::Keyboard;
use crate::dialogue::{validate_delivery_address, validate_full_name, validate_phone_number, State};
use crate::domain::{Cart, Customer, Meta, Order};
use crate::errors::{BotError, BotResult, StoreError};
use crate::store::CustomerUpdate;

impl Handler {
    pub async fn checkout(&self, chat_id: i64, customer: &Customer) -> BotResult<()> {
        if customer.cart.is_empty() {
            self.send(chat_id, "cart-empty").await?;
            return Ok(());
        }

        self.store
            .update_state(customer.telegram_id, State::WaitingForFullName)
            .await?;
        self.send(chat_id, "enter-full-name").await?;
        Ok(())
    }

    /// Express delivery is only possible for a single position; such carts
    /// are turned away here and the step is not advanced.
    pub async fn handle_full_name(&self, chat_id: i64, customer: &Customer, input: &str) -> BotResult<()> {
        if customer.meta.is_express() && customer.cart.len() > 1 {
            info!(user_id = %customer.telegram_id, positions = customer.cart.len(), "Express order with several positions rejected");
            self.send_with_keyboard(chat_id, "express-single-position", self.keyboards.cart_preview())
                .await?;
            return Ok(());
        }

        let full_name = match validate_full_name(input) {
            Ok(full_name) => full_name,
            Err(key) => {
                self.send(chat_id, key).await?;
                return Ok(());
            }
        };

        self.store
            .update_customer(
                customer.telegram_id,
                CustomerUpdate::new()
                    .full_name(full_name)
                    .state(State::WaitingForPhoneNumber),
            )
            .await?;
        self.send(chat_id, "enter-phone").await?;
        Ok(())
    }

    pub async fn handle_phone_number(&self, chat_id: i64, customer: &Customer, input: &str) -> BotResult<()> {
        let phone_number = match validate_phone_number(input) {
            Ok(phone_number) => phone_number,
            Err(key) => {
                self.send(chat_id, key).await?;
                return Ok(());
            }
        };

        self.store
            .update_customer(
                customer.telegram_id,
                CustomerUpdate::new()
                    .phone_number(phone_number)
                    .state(State::WaitingForDeliveryAddress),
            )
            .await?;
        self.send(chat_id, "enter-address").await?;
        Ok(())
    }

    /// Creates the order from the cart, empties the cart and sends the
    /// order preview followed by the payment requisites
    pub async fn handle_delivery_address(&self, chat_id: i64, customer: &Customer, input: &str) -> BotResult<()> {
        let address = match validate_delivery_address(input) {
            Ok(address) => address,
            Err(key) => {
                self.send(chat_id, key).await?;
                return Ok(());
            }
        };

        let short_id = self.store.get_free_short_id().await?;
        let order = Order::new(customer, address, customer.meta.is_express(), short_id);

        // Cart first: a stored order never coexists with the cart it came from
        self.store
            .update_customer(
                customer.telegram_id,
                CustomerUpdate::new()
                    .cart(Cart::new())
                    .meta(Meta::default())
                    .last_edit_position(None)
                    .state(State::Default),
            )
            .await?;

        if let Err(e) = self.store.save_order(&order).await {
            error!(user_id = %customer.telegram_id, error = %e, "Failed to save order, restoring cart");
            let restore = CustomerUpdate::new()
                .cart(customer.cart.clone())
                .meta(customer.meta)
                .state(customer.state);
            if let Err(restore_err) = self.store.update_customer(customer.telegram_id, restore).await {
                error!(user_id = %customer.telegram_id, error = %restore_err, "Failed to restore cart");
            }
            return Err(e.into());
        }
        info!(
            user_id = %customer.telegram_id,
            customer = %customer.display_name(),
            short_id = %order.short_id,
            amount_rub = order.amount_rub,
            "Order created"
        );

        let preview = format_order_preview(&self.texts, &order);
        self.chat.send_text(chat_id, &preview, None).await?;

        let requisites = self.texts.get_with_args(
            "requisites",
            &[
                ("total_rub", order.amount_rub.to_string()),
                ("requisites", self.settings.requisites.clone()),
            ],
        );
        let buttons = paid_buttons(&self.texts, &order.short_id)?;
        self.chat
            .send_text(chat_id, &requisites, Some(Keyboard::Inline(buttons)))
            .await?;
        Ok(())
    }

    /// "I paid": only the customer who placed the order can mark it paid
    pub async fn paid(&self, chat_id: i64, customer: &Customer, short_id: Option<&str>) -> BotResult<()> {
        let short_id = short_id.ok_or(BotError::InvalidUpdate)?;

        let order = match self.store.get_order_by_short_id(short_id).await {
            Ok(order) if order.customer.telegram_id == customer.telegram_id => order,
            Ok(_) | Err(StoreError::OrderNotFound(_)) => {
                warn!(user_id = %customer.telegram_id, short_id = %short_id, "Paid pressed for unknown order");
                self.send(chat_id, "order-not-found").await?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        self.store
            .update_order_to_paid(customer.telegram_id, &order.short_id)
            .await?;
        info!(user_id = %customer.telegram_id, short_id = %order.short_id, "Order marked as paid");

        let text = self
            .texts
            .get_with_args("payment-received", &[("short_id", order.short_id.clone())]);
        self.chat.send_text(chat_id, &text, None).await?;
        Ok(())
    }
}
