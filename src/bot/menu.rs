use tracing::warn;

use super::ui_builder::format_orders;
use super::Handler;
use crate::dialogue::State;
use crate::domain::Customer;
use crate::errors::{BotError, BotResult};

impl Handler {
    /// Welcome message with the bottom keyboard, then today's yuan rate
    pub async fn start(&self, chat_id: i64, customer: &Customer) -> BotResult<()> {
        if customer.state != State::Default {
            self.store.update_state(customer.telegram_id, State::Default).await?;
        }
        self.send_with_keyboard(chat_id, "welcome", self.keyboards.bottom_menu())
            .await?;

        match self.pricing.yuan_rate().await {
            Ok(rate) => {
                let text = self
                    .texts
                    .get_with_args("yuan-rate", &[("rate", format!("{rate:.2}"))]);
                self.chat.send_text(chat_id, &text, None).await?;
            }
            Err(e) => warn!(user_id = %chat_id, error = %e, "Skipping yuan rate in welcome"),
        }
        Ok(())
    }

    /// Drops whatever step the customer was in and shows the menu
    pub async fn menu(&self, chat_id: i64, customer: &Customer) -> BotResult<()> {
        if customer.state != State::Default {
            self.store.update_state(customer.telegram_id, State::Default).await?;
        }
        self.send_with_keyboard(chat_id, "menu-title", self.keyboards.menu())
            .await?;
        Ok(())
    }

    pub async fn my_orders(&self, chat_id: i64, customer: &Customer) -> BotResult<()> {
        let orders = self.store.get_orders_for_customer(customer.telegram_id).await?;
        if orders.is_empty() {
            self.send(chat_id, "my-orders-empty").await?;
            return Ok(());
        }

        let text = format_orders(&self.texts, &orders);
        self.chat.send_text(chat_id, &text, None).await?;
        Ok(())
    }

    pub async fn faq(&self, chat_id: i64) -> BotResult<()> {
        self.send_with_keyboard(chat_id, "faq-title", self.keyboards.faq())
            .await?;
        Ok(())
    }

    pub async fn faq_answer(&self, chat_id: i64, index: usize) -> BotResult<()> {
        let entry = self.settings.faq.get(index).ok_or(BotError::InvalidUpdate)?;
        let text = format!("❓ {}\n\n{}", entry.question, entry.answer);
        self.chat.send_text(chat_id, &text, None).await?;
        Ok(())
    }
}
