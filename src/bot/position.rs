//! Position flow: delivery parameters for a fresh cart, then size, button
//! colour, price and link for every position.
//!
//! ```text
//! empty cart:     order type ─┬─ normal ──> location ──┬─> category
//!                             └─ express ──────────────┘
//! non-empty cart: category
//! category -> size -> button -> price -> link -> (append, Default)
//! ```

use tracing::{debug, info};

use super::Handler;
use crate::callback::MAX_CART_POSITIONS;
use crate::dialogue::{parse_price, validate_link, validate_size, State};
use crate::domain::{Button, Category, Customer, Location, Meta, OrderType, PositionDraft};
use crate::errors::{BotError, BotResult};
use crate::store::CustomerUpdate;

fn draft_of(customer: &Customer) -> BotResult<PositionDraft> {
    customer.last_edit_position.clone().ok_or(BotError::InvalidUpdate)
}

impl Handler {
    /// Starts collecting a new position. The delivery parameters are only
    /// asked for when the cart is empty, otherwise the stored ones are reused.
    pub async fn add_position(&self, chat_id: i64, customer: &Customer) -> BotResult<()> {
        if customer.cart.len() >= MAX_CART_POSITIONS {
            debug!(user_id = %customer.telegram_id, positions = customer.cart.len(), "Cart is full");
            self.send(chat_id, "cart-full").await?;
            return Ok(());
        }

        if customer.cart.is_empty() {
            debug!(user_id = %customer.telegram_id, "Fresh cart, asking for order type");
            self.store
                .update_customer(
                    customer.telegram_id,
                    CustomerUpdate::new()
                        .state(State::WaitingForOrderType)
                        .meta(Meta::default())
                        .last_edit_position(None),
                )
                .await?;
            self.send_with_keyboard(chat_id, "choose-order-type", self.keyboards.order_type())
                .await?;
        } else {
            debug!(user_id = %customer.telegram_id, "Reusing delivery parameters of the cart");
            self.store
                .update_customer(
                    customer.telegram_id,
                    CustomerUpdate::new()
                        .state(State::WaitingForCategory)
                        .last_edit_position(None),
                )
                .await?;
            self.send_with_keyboard(chat_id, "choose-category", self.keyboards.category())
                .await?;
        }
        Ok(())
    }

    /// Express delivery has one price regardless of origin, so the location
    /// step is skipped
    pub async fn handle_order_type(&self, chat_id: i64, customer: &Customer, order_type: OrderType) -> BotResult<()> {
        let mut meta = customer.meta;
        meta.order_type = Some(order_type);

        match order_type {
            OrderType::Express => {
                meta.location = Some(Location::Other);
                self.store
                    .update_customer(
                        customer.telegram_id,
                        CustomerUpdate::new().meta(meta).state(State::WaitingForCategory),
                    )
                    .await?;
                self.send_with_keyboard(chat_id, "choose-category", self.keyboards.category())
                    .await?;
            }
            OrderType::Normal => {
                self.store
                    .update_customer(
                        customer.telegram_id,
                        CustomerUpdate::new().meta(meta).state(State::WaitingForLocation),
                    )
                    .await?;
                self.send_with_keyboard(chat_id, "choose-location", self.keyboards.location())
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn handle_location(&self, chat_id: i64, customer: &Customer, location: Location) -> BotResult<()> {
        let mut meta = customer.meta;
        meta.location = Some(location);
        self.store
            .update_customer(
                customer.telegram_id,
                CustomerUpdate::new().meta(meta).state(State::WaitingForCategory),
            )
            .await?;
        self.send_with_keyboard(chat_id, "choose-category", self.keyboards.category())
            .await?;
        Ok(())
    }

    pub async fn handle_category(&self, chat_id: i64, customer: &Customer, category: Category) -> BotResult<()> {
        let mut meta = customer.meta;
        meta.category = Some(category);
        self.store
            .update_customer(
                customer.telegram_id,
                CustomerUpdate::new()
                    .meta(meta)
                    .last_edit_position(Some(PositionDraft::new(Some(category))))
                    .state(State::WaitingForSize),
            )
            .await?;
        self.send(chat_id, "enter-size").await?;
        Ok(())
    }

    pub async fn handle_size(&self, chat_id: i64, customer: &Customer, input: &str) -> BotResult<()> {
        let size = match validate_size(input) {
            Ok(size) => size,
            Err(key) => {
                self.send(chat_id, key).await?;
                return Ok(());
            }
        };

        let draft = draft_of(customer)?.with_size(size);
        self.store
            .update_customer(
                customer.telegram_id,
                CustomerUpdate::new()
                    .last_edit_position(Some(draft))
                    .state(State::WaitingForButton),
            )
            .await?;
        self.send_with_keyboard(chat_id, "choose-button", self.keyboards.button())
            .await?;
        Ok(())
    }

    pub async fn handle_button(&self, chat_id: i64, customer: &Customer, button: Button) -> BotResult<()> {
        let mut draft = draft_of(customer)?;
        draft.button = Some(button);
        self.store
            .update_customer(
                customer.telegram_id,
                CustomerUpdate::new()
                    .last_edit_position(Some(draft))
                    .state(State::WaitingForPrice),
            )
            .await?;
        self.send(chat_id, "enter-price").await?;
        Ok(())
    }

    pub async fn handle_price(&self, chat_id: i64, customer: &Customer, input: &str) -> BotResult<()> {
        let price_yuan = match parse_price(input) {
            Ok(price) => price,
            Err(key) => {
                self.send(chat_id, key).await?;
                return Ok(());
            }
        };

        let mut draft = draft_of(customer)?;
        let mut meta = customer.meta;
        meta.category = draft.category.or(meta.category);
        let price_rub = self.pricing.apply_formula(price_yuan, &meta).await?;

        draft.price_yuan = Some(price_yuan);
        draft.price_rub = Some(price_rub);
        self.store
            .update_customer(
                customer.telegram_id,
                CustomerUpdate::new()
                    .last_edit_position(Some(draft))
                    .state(State::WaitingForLink),
            )
            .await?;

        let text = self
            .texts
            .get_with_args("price-calculated", &[("price_rub", price_rub.to_string())]);
        self.chat.send_text(chat_id, &text, None).await?;
        Ok(())
    }

    /// Last step of a position: the finished position is appended to the cart
    pub async fn handle_link(&self, chat_id: i64, customer: &Customer, input: &str) -> BotResult<()> {
        let link = match validate_link(input, &self.link_pattern) {
            Ok(link) => link,
            Err(key) => {
                self.send(chat_id, key).await?;
                return Ok(());
            }
        };

        if customer.cart.len() >= MAX_CART_POSITIONS {
            self.store
                .update_customer(
                    customer.telegram_id,
                    CustomerUpdate::new().last_edit_position(None).state(State::Default),
                )
                .await?;
            self.send(chat_id, "cart-full").await?;
            return Ok(());
        }

        let mut draft = draft_of(customer)?;
        draft.shop_link = Some(link);
        let position = draft.complete().ok_or(BotError::InvalidUpdate)?;

        let mut cart = customer.cart.clone();
        cart.add(position);
        info!(user_id = %customer.telegram_id, positions = cart.len(), "Position added to cart");

        self.store
            .update_customer(
                customer.telegram_id,
                CustomerUpdate::new()
                    .cart(cart)
                    .last_edit_position(None)
                    .state(State::Default),
            )
            .await?;
        self.send_with_keyboard(chat_id, "position-added", self.keyboards.position_added())
            .await?;
        Ok(())
    }
}
