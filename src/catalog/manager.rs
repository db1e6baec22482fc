use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::CatalogItem;
use crate::errors::StoreError;
use crate::store::{Store, StoreResult};

/// Catalog administration. Keeps ranks contiguous and resets every
/// customer's pagination cursor after each change.
pub struct CatalogManager {
    store: Arc<dyn Store>,
}

impl CatalogManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Appends the item at the end of the catalog and returns its rank
    pub async fn add_item(&self, item: CatalogItem) -> StoreResult<u32> {
        let item_id = item.item_id;
        let rank = self.store.add_item(item).await?;
        info!(item_id = %item_id, rank, "Added catalog item");
        self.store.nullify_catalog_offsets().await?;
        Ok(rank)
    }

    pub async fn remove_item(&self, item_id: Uuid) -> StoreResult<()> {
        info!(item_id = %item_id, "Removing catalog item");
        self.store.remove_item(item_id).await?;
        self.store.nullify_catalog_offsets().await
    }

    /// Moves the item one place towards the front. No-op for the first item.
    pub async fn rank_up(&self, item_id: Uuid) -> StoreResult<()> {
        let rank = self.store.get_rank_by_id(item_id).await?;
        if rank == 0 {
            return Ok(());
        }
        let neighbour = self.store.get_id_by_rank(rank - 1).await?;
        self.store.update_ranks(item_id, neighbour).await?;
        self.store.nullify_catalog_offsets().await
    }

    /// Moves the item one place towards the back. No-op for the last item.
    pub async fn rank_down(&self, item_id: Uuid) -> StoreResult<()> {
        let rank = self.store.get_rank_by_id(item_id).await?;
        let neighbour = match self.store.get_id_by_rank(rank + 1).await {
            Ok(id) => id,
            Err(StoreError::ItemNotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        self.store.update_ranks(neighbour, item_id).await?;
        self.store.nullify_catalog_offsets().await
    }
}
