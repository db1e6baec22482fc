use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Category;

/// Price button colour on the shop page. The price depends on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    Turquoise,
    Grey,
    Used95,
}

/// A complete cart line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub position_id: Uuid,
    pub shop_link: String,
    pub size: String,
    pub button: Button,
    pub category: Option<Category>,
    pub price_yuan: u64,
    pub price_rub: u64,
}

impl Position {
    /// `#` is entered for items sold without a size
    pub fn has_size(&self) -> bool {
        self.size != "#"
    }
}

/// A cart line that is still being collected, one field per conversation step
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDraft {
    pub position_id: Uuid,
    pub size: Option<String>,
    pub button: Option<Button>,
    pub category: Option<Category>,
    pub price_yuan: Option<u64>,
    pub price_rub: Option<u64>,
    pub shop_link: Option<String>,
}

impl PositionDraft {
    pub fn new(category: Option<Category>) -> Self {
        Self {
            position_id: Uuid::new_v4(),
            size: None,
            button: None,
            category,
            price_yuan: None,
            price_rub: None,
            shop_link: None,
        }
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    /// Returns the finished position once size, button, price and link are all set
    pub fn complete(&self) -> Option<Position> {
        Some(Position {
            position_id: self.position_id,
            shop_link: self.shop_link.clone()?,
            size: self.size.clone()?,
            button: self.button?,
            category: self.category,
            price_yuan: self.price_yuan?,
            price_rub: self.price_rub?,
        })
    }
}

/// Ordered cart lines. Removal does not preserve order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart(Vec<Position>);

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, position: Position) {
        self.0.push(position);
    }

    /// Swaps the matching line to the end and truncates. Returns whether a
    /// line was removed.
    pub fn remove(&mut self, position_id: Uuid) -> bool {
        match self.0.iter().position(|p| p.position_id == position_id) {
            Some(index) => {
                self.0.swap_remove(index);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Position> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Position> {
        self.0.iter()
    }

    /// Saturates instead of overflowing
    pub fn total_rub(&self) -> u64 {
        self.0.iter().fold(0, |total, p| total.saturating_add(p.price_rub))
    }

    pub fn total_yuan(&self) -> u64 {
        self.0.iter().fold(0, |total, p| total.saturating_add(p.price_yuan))
    }
}

impl From<Vec<Position>> for Cart {
    fn from(positions: Vec<Position>) -> Self {
        Self(positions)
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a Position;
    type IntoIter = std::slice::Iter<'a, Position>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
