//! Persistence seam. Handlers only ever talk to [`Store`]; the binary picks
//! [`PgStore`] when a database is configured and [`MemoryStore`] otherwise.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::dialogue::State;
use crate::domain::{Cart, CatalogItem, Customer, Meta, Order, PositionDraft};
use crate::errors::StoreError;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Called with the fresh rank-ordered catalog after every catalog mutation
pub type CatalogListener = Arc<dyn Fn(&[CatalogItem]) + Send + Sync>;

/// Fields of a customer to overwrite. `None` leaves the stored value alone.
///
/// `last_edit_position` is doubly optional: `Some(None)` clears the draft.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CustomerUpdate {
    pub state: Option<State>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub cart: Option<Cart>,
    pub meta: Option<Meta>,
    pub calculator_meta: Option<Meta>,
    pub catalog_offset: Option<usize>,
    pub last_edit_position: Option<Option<PositionDraft>>,
}

impl CustomerUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }

    pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }

    pub fn cart(mut self, cart: Cart) -> Self {
        self.cart = Some(cart);
        self
    }

    pub fn meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn calculator_meta(mut self, meta: Meta) -> Self {
        self.calculator_meta = Some(meta);
        self
    }

    pub fn catalog_offset(mut self, offset: usize) -> Self {
        self.catalog_offset = Some(offset);
        self
    }

    pub fn last_edit_position(mut self, draft: Option<PositionDraft>) -> Self {
        self.last_edit_position = Some(draft);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the set fields to an in-memory record
    pub fn apply_to(self, customer: &mut Customer) {
        if let Some(state) = self.state {
            customer.state = state;
        }
        if let Some(username) = self.username {
            customer.username = username;
        }
        if let Some(full_name) = self.full_name {
            customer.full_name = Some(full_name);
        }
        if let Some(phone_number) = self.phone_number {
            customer.phone_number = Some(phone_number);
        }
        if let Some(cart) = self.cart {
            customer.cart = cart;
        }
        if let Some(meta) = self.meta {
            customer.meta = meta;
        }
        if let Some(meta) = self.calculator_meta {
            customer.calculator_meta = meta;
        }
        if let Some(offset) = self.catalog_offset {
            customer.catalog_offset = offset;
        }
        if let Some(draft) = self.last_edit_position {
            customer.last_edit_position = draft;
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    // Customers
    async fn get_customer(&self, telegram_id: i64) -> StoreResult<Customer>;
    async fn save_customer(&self, customer: &Customer) -> StoreResult<()>;
    async fn update_customer(&self, telegram_id: i64, update: CustomerUpdate) -> StoreResult<()>;
    async fn update_state(&self, telegram_id: i64, state: State) -> StoreResult<()>;
    async fn nullify_catalog_offsets(&self) -> StoreResult<()>;

    // Catalog
    async fn get_catalog(&self) -> StoreResult<Vec<CatalogItem>>;
    /// Appends the item after the last one. The rank is assigned inside the
    /// write, ignoring `item.rank`, and returned.
    async fn add_item(&self, item: CatalogItem) -> StoreResult<u32>;
    async fn remove_item(&self, item_id: Uuid) -> StoreResult<()>;
    /// Atomically swaps the ranks of the two items
    async fn update_ranks(&self, up_id: Uuid, down_id: Uuid) -> StoreResult<()>;
    async fn get_rank_by_id(&self, item_id: Uuid) -> StoreResult<u32>;
    async fn get_id_by_rank(&self, rank: u32) -> StoreResult<Uuid>;

    // Orders
    async fn save_order(&self, order: &Order) -> StoreResult<()>;
    async fn get_order_by_short_id(&self, short_id: &str) -> StoreResult<Order>;
    /// A short id not used by any stored order
    async fn get_free_short_id(&self) -> StoreResult<String>;
    async fn get_orders_for_customer(&self, telegram_id: i64) -> StoreResult<Vec<Order>>;
    async fn update_order_to_paid(&self, telegram_id: i64, short_id: &str) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, OrderType};

    #[test]
    fn test_partial_update_touches_only_set_fields() {
        let mut customer = Customer::new(1, "ivan");
        customer.full_name = Some("Иванов Иван Иванович".to_string());

        let meta = Meta {
            order_type: Some(OrderType::Normal),
            location: None,
            category: Some(Category::Light),
        };
        CustomerUpdate::new()
            .state(State::WaitingForSize)
            .meta(meta)
            .apply_to(&mut customer);

        assert_eq!(customer.state, State::WaitingForSize);
        assert_eq!(customer.meta, meta);
        assert_eq!(customer.full_name.as_deref(), Some("Иванов Иван Иванович"));
        assert_eq!(customer.username, "ivan");
    }

    #[test]
    fn test_clearing_the_draft() {
        let mut customer = Customer::new(1, "ivan");
        customer.last_edit_position = Some(PositionDraft::new(None));

        CustomerUpdate::new().apply_to(&mut customer);
        assert!(customer.last_edit_position.is_some());

        CustomerUpdate::new().last_edit_position(None).apply_to(&mut customer);
        assert!(customer.last_edit_position.is_none());
    }
}
