use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{CatalogListener, CustomerUpdate, Store, StoreResult};
use crate::dialogue::State;
use crate::domain::{generate_short_id, normalize_ranks, CatalogItem, Customer, Order};
use crate::errors::StoreError;

const SHORT_ID_ATTEMPTS: usize = 32;

/// Process-local store used in tests and when no database is configured
#[derive(Default)]
pub struct MemoryStore {
    customers: RwLock<HashMap<i64, Customer>>,
    catalog: RwLock<Vec<CatalogItem>>,
    orders: RwLock<Vec<Order>>,
    listener: Option<CatalogListener>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog_listener(listener: CatalogListener) -> Self {
        Self {
            listener: Some(listener),
            ..Self::default()
        }
    }

    fn notify(&self, catalog: &[CatalogItem]) {
        if let Some(listener) = &self.listener {
            listener(catalog);
        }
    }

    fn sorted(catalog: &[CatalogItem]) -> Vec<CatalogItem> {
        let mut items = catalog.to_vec();
        items.sort_by_key(|item| item.rank);
        items
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_customer(&self, telegram_id: i64) -> StoreResult<Customer> {
        self.customers
            .read()
            .await
            .get(&telegram_id)
            .cloned()
            .ok_or(StoreError::CustomerNotFound(telegram_id))
    }

    async fn save_customer(&self, customer: &Customer) -> StoreResult<()> {
        self.customers
            .write()
            .await
            .insert(customer.telegram_id, customer.clone());
        Ok(())
    }

    async fn update_customer(&self, telegram_id: i64, update: CustomerUpdate) -> StoreResult<()> {
        let mut customers = self.customers.write().await;
        let customer = customers
            .get_mut(&telegram_id)
            .ok_or(StoreError::CustomerNotFound(telegram_id))?;
        update.apply_to(customer);
        Ok(())
    }

    async fn update_state(&self, telegram_id: i64, state: State) -> StoreResult<()> {
        self.update_customer(telegram_id, CustomerUpdate::new().state(state))
            .await
    }

    async fn nullify_catalog_offsets(&self) -> StoreResult<()> {
        for customer in self.customers.write().await.values_mut() {
            customer.catalog_offset = 0;
        }
        Ok(())
    }

    async fn get_catalog(&self) -> StoreResult<Vec<CatalogItem>> {
        Ok(Self::sorted(&self.catalog.read().await))
    }

    async fn add_item(&self, mut item: CatalogItem) -> StoreResult<u32> {
        let (rank, snapshot) = {
            let mut catalog = self.catalog.write().await;
            let rank = catalog.len() as u32;
            item.rank = rank;
            debug!(item_id = %item.item_id, rank, "Adding catalog item");
            catalog.push(item);
            (rank, Self::sorted(&catalog))
        };
        self.notify(&snapshot);
        Ok(rank)
    }

    async fn remove_item(&self, item_id: Uuid) -> StoreResult<()> {
        let snapshot = {
            let mut catalog = self.catalog.write().await;
            let index = catalog
                .iter()
                .position(|item| item.item_id == item_id)
                .ok_or_else(|| StoreError::item_not_found(item_id))?;
            catalog.remove(index);
            let normalized = normalize_ranks(std::mem::take(&mut *catalog));
            *catalog = normalized.clone();
            normalized
        };
        self.notify(&snapshot);
        Ok(())
    }

    async fn update_ranks(&self, up_id: Uuid, down_id: Uuid) -> StoreResult<()> {
        let snapshot = {
            let mut catalog = self.catalog.write().await;
            let up = catalog
                .iter()
                .position(|item| item.item_id == up_id)
                .ok_or_else(|| StoreError::item_not_found(up_id))?;
            let down = catalog
                .iter()
                .position(|item| item.item_id == down_id)
                .ok_or_else(|| StoreError::item_not_found(down_id))?;
            let up_rank = catalog[up].rank;
            catalog[up].rank = catalog[down].rank;
            catalog[down].rank = up_rank;
            Self::sorted(&catalog)
        };
        self.notify(&snapshot);
        Ok(())
    }

    async fn get_rank_by_id(&self, item_id: Uuid) -> StoreResult<u32> {
        self.catalog
            .read()
            .await
            .iter()
            .find(|item| item.item_id == item_id)
            .map(|item| item.rank)
            .ok_or_else(|| StoreError::item_not_found(item_id))
    }

    async fn get_id_by_rank(&self, rank: u32) -> StoreResult<Uuid> {
        self.catalog
            .read()
            .await
            .iter()
            .find(|item| item.rank == rank)
            .map(|item| item.item_id)
            .ok_or_else(|| StoreError::ItemNotFound(format!("rank {rank}")))
    }

    async fn save_order(&self, order: &Order) -> StoreResult<()> {
        self.orders.write().await.push(order.clone());
        Ok(())
    }

    async fn get_order_by_short_id(&self, short_id: &str) -> StoreResult<Order> {
        self.orders
            .read()
            .await
            .iter()
            .find(|order| order.short_id == short_id)
            .cloned()
            .ok_or_else(|| StoreError::OrderNotFound(short_id.to_string()))
    }

    async fn get_free_short_id(&self) -> StoreResult<String> {
        let orders = self.orders.read().await;
        for _ in 0..SHORT_ID_ATTEMPTS {
            let candidate = generate_short_id();
            if !orders.iter().any(|order| order.short_id == candidate) {
                return Ok(candidate);
            }
        }
        Err(StoreError::Corrupted("short id space exhausted".to_string()))
    }

    async fn get_orders_for_customer(&self, telegram_id: i64) -> StoreResult<Vec<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .filter(|order| order.customer.telegram_id == telegram_id)
            .cloned()
            .collect())
    }

    async fn update_order_to_paid(&self, telegram_id: i64, short_id: &str) -> StoreResult<()> {
        let mut orders = self.orders.write().await;
        let order = orders
            .iter_mut()
            .find(|order| order.short_id == short_id && order.customer.telegram_id == telegram_id)
            .ok_or_else(|| StoreError::OrderNotFound(short_id.to_string()))?;
        order.is_paid = true;
        Ok(())
    }
}
