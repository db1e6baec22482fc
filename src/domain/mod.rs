//! # Domain Model
//!
//! Customers, their carts and the orders built from them, plus the catalog
//! items shown in the paginated catalog.
//!
//! ## Core Concepts
//!
//! - **Position**: one cart line, collected step by step (size, button
//!   colour, price, link) as a [`PositionDraft`] and promoted to a
//!   [`Position`] once complete
//! - **Meta**: delivery parameters (order type, origin, category) that select
//!   the price formula
//! - **Order**: a snapshot of the cart at checkout with a short shareable id

pub mod cart;
pub mod catalog_item;
pub mod customer;
pub mod order;

pub use cart::{Button, Cart, Position, PositionDraft};
pub use catalog_item::{normalize_ranks, CatalogItem};
pub use customer::{make_username, Customer};
pub use order::{generate_short_id, Order, OrderCustomer, OrderStatus};

use serde::{Deserialize, Serialize};

/// Delivery speed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Express,
    Normal,
}

/// The customer's home region
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    SaintPetersburg,
    Izhevsk,
    Other,
}

/// Shipping weight class of an item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Light,
    Heavy,
    Other,
}

/// Delivery parameters chosen for the active order (or for the calculator)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub order_type: Option<OrderType>,
    pub location: Option<Location>,
    pub category: Option<Category>,
}

impl Meta {
    pub fn is_express(&self) -> bool {
        self.order_type == Some(OrderType::Express)
    }
}
