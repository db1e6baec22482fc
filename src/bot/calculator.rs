//! Price calculator. Mirrors the delivery parameter steps of the order flow
//! but only ever touches `calculator_meta`.

use super::Handler;
use crate::dialogue::{parse_price, State};
use crate::domain::{Category, Customer, Location, Meta, OrderType};
use crate::errors::BotResult;
use crate::store::CustomerUpdate;

impl Handler {
    pub async fn calculator(&self, chat_id: i64, customer: &Customer) -> BotResult<()> {
        self.store
            .update_customer(
                customer.telegram_id,
                CustomerUpdate::new()
                    .calculator_meta(Meta::default())
                    .state(State::WaitingForCalculatorOrderType),
            )
            .await?;
        self.send_with_keyboard(chat_id, "choose-order-type", self.keyboards.calculator_order_type())
            .await?;
        Ok(())
    }

    pub async fn calculator_order_type(&self, chat_id: i64, customer: &Customer, order_type: OrderType) -> BotResult<()> {
        let mut meta = customer.calculator_meta;
        meta.order_type = Some(order_type);

        if order_type == OrderType::Express {
            meta.location = Some(Location::Other);
            self.store
                .update_customer(
                    customer.telegram_id,
                    CustomerUpdate::new()
                        .calculator_meta(meta)
                        .state(State::WaitingForCalculatorCategory),
                )
                .await?;
            self.send_with_keyboard(chat_id, "choose-category", self.keyboards.calculator_category())
                .await?;
            return Ok(());
        }

        self.store
            .update_customer(
                customer.telegram_id,
                CustomerUpdate::new()
                    .calculator_meta(meta)
                    .state(State::WaitingForCalculatorLocation),
            )
            .await?;
        self.send_with_keyboard(chat_id, "choose-location", self.keyboards.calculator_location())
            .await?;
        Ok(())
    }

    pub async fn calculator_location(&self, chat_id: i64, customer: &Customer, location: Location) -> BotResult<()> {
        let mut meta = customer.calculator_meta;
        meta.location = Some(location);
        self.store
            .update_customer(
                customer.telegram_id,
                CustomerUpdate::new()
                    .calculator_meta(meta)
                    .state(State::WaitingForCalculatorCategory),
            )
            .await?;
        self.send_with_keyboard(chat_id, "choose-category", self.keyboards.calculator_category())
            .await?;
        Ok(())
    }

    pub async fn calculator_category(&self, chat_id: i64, customer: &Customer, category: Category) -> BotResult<()> {
        let mut meta = customer.calculator_meta;
        meta.category = Some(category);
        self.store
            .update_customer(
                customer.telegram_id,
                CustomerUpdate::new()
                    .calculator_meta(meta)
                    .state(State::WaitingForCalculatorInput),
            )
            .await?;
        self.send(chat_id, "calculator-enter-amount").await?;
        Ok(())
    }

    pub async fn calculator_input(&self, chat_id: i64, customer: &Customer, input: &str) -> BotResult<()> {
        let amount = match parse_price(input) {
            Ok(amount) => amount,
            Err(key) => {
                self.send(chat_id, key).await?;
                return Ok(());
            }
        };

        let price_rub = self
            .pricing
            .apply_formula(amount, &customer.calculator_meta)
            .await?;
        self.store
            .update_state(customer.telegram_id, State::Default)
            .await?;

        let text = self
            .texts
            .get_with_args("calculator-result", &[("price_rub", price_rub.to_string())]);
        self.chat
            .send_text(chat_id, &text, Some(self.keyboards.calculate_more()))
            .await?;
        Ok(())
    }
}
