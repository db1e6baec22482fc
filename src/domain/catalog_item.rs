use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An entry of the browsable catalog.
///
/// `rank` defines display order; across the whole catalog ranks always form
/// the contiguous sequence `0..n`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub item_id: Uuid,
    pub image_urls: Vec<String>,
    pub title: String,
    pub rank: u32,
    pub available_sizes: Vec<String>,
    pub available_in_city: Vec<String>,
    pub quantity: u32,
    pub price_rub: u64,
    pub shop_link: String,
}

impl CatalogItem {
    pub fn new(title: impl Into<String>, image_urls: Vec<String>) -> Self {
        Self {
            item_id: Uuid::new_v4(),
            image_urls,
            title: title.into(),
            ..Default::default()
        }
    }

    /// The empty value returned when pagination has no item to offer
    pub fn sentinel() -> Self {
        Self::default()
    }

    pub fn is_sentinel(&self) -> bool {
        self.item_id.is_nil()
    }

    pub fn caption(&self) -> String {
        let mut caption = format!("{}\n\n{} ₽", self.title, self.price_rub);
        if !self.available_sizes.is_empty() {
            caption.push_str(&format!("\n📏 {}", self.available_sizes.join(", ")));
        }
        if !self.available_in_city.is_empty() {
            caption.push_str(&format!("\n🏙 {}", self.available_in_city.join(", ")));
        }
        caption
    }
}

/// Sorts by current rank and reassigns ranks `0..n`, keeping relative order
pub fn normalize_ranks(mut items: Vec<CatalogItem>) -> Vec<CatalogItem> {
    items.sort_by_key(|item| item.rank);
    for (rank, item) in items.iter_mut().enumerate() {
        item.rank = rank as u32;
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ranks_closes_gaps() {
        let mut a = CatalogItem::new("a", vec![]);
        a.rank = 0;
        let mut c = CatalogItem::new("c", vec![]);
        c.rank = 2;
        let mut d = CatalogItem::new("d", vec![]);
        d.rank = 5;

        let items = normalize_ranks(vec![d, a, c]);

        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        let ranks: Vec<u32> = items.iter().map(|i| i.rank).collect();
        assert_eq!(titles, vec!["a", "c", "d"]);
        assert_eq!(ranks, vec![0, 1, 2]);
    }

    #[test]
    fn test_sentinel() {
        assert!(CatalogItem::sentinel().is_sentinel());
        assert!(!CatalogItem::new("x", vec![]).is_sentinel());
    }
}
