use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cart, Customer};

const SHORT_ID_ALPHABET: &[u8] = b"0123456789ABCDEFGHJKLMNPQRSTUVWXYZ";
const SHORT_ID_LEN: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    NotApproved,
    Approved,
    Buyout,
    Transported,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::NotApproved => "not_approved",
            OrderStatus::Approved => "approved",
            OrderStatus::Buyout => "buyout",
            OrderStatus::Transported => "transported",
            OrderStatus::Delivered => "delivered",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not_approved" => Some(OrderStatus::NotApproved),
            "approved" => Some(OrderStatus::Approved),
            "buyout" => Some(OrderStatus::Buyout),
            "transported" => Some(OrderStatus::Transported),
            "delivered" => Some(OrderStatus::Delivered),
            _ => None,
        }
    }
}

/// Who placed the order, as known at checkout time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCustomer {
    pub telegram_id: i64,
    pub username: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: Uuid,
    pub short_id: String,
    pub customer: OrderCustomer,
    pub cart: Cart,
    pub amount_rub: u64,
    pub amount_yuan: u64,
    pub delivery_address: String,
    pub is_express: bool,
    pub is_paid: bool,
    pub is_approved: bool,
    pub status: OrderStatus,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Snapshots the customer's cart; totals are the sums of all position prices
    pub fn new(customer: &Customer, delivery_address: impl Into<String>, is_express: bool, short_id: impl Into<String>) -> Self {
        Self {
            order_id: Uuid::new_v4(),
            short_id: short_id.into(),
            customer: OrderCustomer {
                telegram_id: customer.telegram_id,
                username: customer.username.clone(),
                full_name: customer.full_name.clone(),
                phone_number: customer.phone_number.clone(),
            },
            cart: customer.cart.clone(),
            amount_rub: customer.cart.total_rub(),
            amount_yuan: customer.cart.total_yuan(),
            delivery_address: delivery_address.into(),
            is_express,
            is_paid: false,
            is_approved: false,
            status: OrderStatus::NotApproved,
            comment: None,
            created_at: Utc::now(),
        }
    }
}

/// Random candidate for a short order id. Uniqueness is checked by the store.
pub fn generate_short_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SHORT_ID_LEN)
        .map(|_| SHORT_ID_ALPHABET[rng.gen_range(0..SHORT_ID_ALPHABET.len())] as char)
        .collect()
}
