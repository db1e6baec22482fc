use std::sync::{RwLock, RwLockReadGuard};

use crate::domain::CatalogItem;

/// Read-mostly snapshot of the catalog used for pagination.
///
/// `load` swaps the whole snapshot under the write lock, so readers always see
/// either the previous or the new catalog, never a mix. Out-of-range lookups
/// return [`CatalogItem::sentinel`] instead of failing.
#[derive(Debug, Default)]
pub struct CatalogCache {
    items: RwLock<Vec<CatalogItem>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the snapshot with a copy of `items`
    pub fn load(&self, items: &[CatalogItem]) {
        let snapshot = items.to_vec();
        let mut guard = self.items.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = snapshot;
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<CatalogItem>> {
        self.items.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn has_next(&self, offset: usize) -> bool {
        offset + 1 < self.read().len()
    }

    pub fn has_prev(&self, offset: usize) -> bool {
        offset > 0 && offset < self.read().len()
    }

    pub fn load_next(&self, offset: usize) -> CatalogItem {
        let items = self.read();
        if offset + 1 < items.len() {
            items[offset + 1].clone()
        } else {
            CatalogItem::sentinel()
        }
    }

    pub fn load_prev(&self, offset: usize) -> CatalogItem {
        let items = self.read();
        if offset > 0 && offset < items.len() {
            items[offset - 1].clone()
        } else {
            CatalogItem::sentinel()
        }
    }

    pub fn load_at(&self, offset: usize) -> CatalogItem {
        self.read().get(offset).cloned().unwrap_or_default()
    }

    /// Clamps a possibly stale cursor into the current snapshot
    pub fn clamp_offset(&self, offset: usize) -> usize {
        let len = self.read().len();
        if offset < len {
            offset
        } else {
            0
        }
    }
}
