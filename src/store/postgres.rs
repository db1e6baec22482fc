//! PostgreSQL store. Carts, metas and drafts live in JSONB columns; partial
//! customer updates only touch the columns that were set.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::{debug, info};
use uuid::Uuid;

use super::{CatalogListener, CustomerUpdate, Store, StoreResult};
use crate::dialogue::State;
use crate::domain::{
    generate_short_id, Cart, CatalogItem, Customer, Meta, Order, OrderCustomer, OrderStatus, PositionDraft,
};
use crate::errors::StoreError;

const SHORT_ID_ATTEMPTS: usize = 32;

pub struct PgStore {
    pool: PgPool,
    listener: Option<CatalogListener>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, listener: None }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn with_catalog_listener(mut self, listener: CatalogListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the tables if they do not exist yet
    pub async fn init_schema(&self) -> StoreResult<()> {
        info!("Initializing database schema...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS customers (
                telegram_id BIGINT PRIMARY KEY,
                username TEXT NOT NULL,
                full_name TEXT,
                phone_number TEXT,
                state SMALLINT NOT NULL DEFAULT 0,
                cart JSONB NOT NULL DEFAULT '[]',
                meta JSONB NOT NULL DEFAULT '{}',
                calculator_meta JSONB NOT NULL DEFAULT '{}',
                catalog_offset BIGINT NOT NULL DEFAULT 0,
                last_edit_position JSONB
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS catalog (
                item_id UUID PRIMARY KEY,
                image_urls JSONB NOT NULL,
                title TEXT NOT NULL,
                rank INTEGER NOT NULL,
                available_sizes JSONB NOT NULL,
                available_in_city JSONB NOT NULL,
                quantity INTEGER NOT NULL,
                price_rub BIGINT NOT NULL,
                shop_link TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                order_id UUID PRIMARY KEY,
                short_id TEXT NOT NULL UNIQUE,
                customer_id BIGINT NOT NULL,
                customer JSONB NOT NULL,
                cart JSONB NOT NULL,
                amount_rub BIGINT NOT NULL,
                amount_yuan BIGINT NOT NULL,
                delivery_address TEXT NOT NULL,
                is_express BOOLEAN NOT NULL,
                is_paid BOOLEAN NOT NULL DEFAULT FALSE,
                is_approved BOOLEAN NOT NULL DEFAULT FALSE,
                status TEXT NOT NULL,
                comment TEXT,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS orders_customer_id_idx ON orders (customer_id)")
            .execute(&self.pool)
            .await?;

        info!("Database schema initialized successfully");
        Ok(())
    }

    async fn notify(&self) -> StoreResult<()> {
        if let Some(listener) = &self.listener {
            let catalog = self.get_catalog().await?;
            listener(&catalog);
        }
        Ok(())
    }
}

fn customer_from_row(row: &PgRow) -> StoreResult<Customer> {
    let state: i16 = row.try_get("state")?;
    let offset: i64 = row.try_get("catalog_offset")?;
    let cart: Json<Cart> = row.try_get("cart")?;
    let meta: Json<Meta> = row.try_get("meta")?;
    let calculator_meta: Json<Meta> = row.try_get("calculator_meta")?;
    let draft: Option<Json<PositionDraft>> = row.try_get("last_edit_position")?;

    Ok(Customer {
        telegram_id: row.try_get("telegram_id")?,
        username: row.try_get("username")?,
        full_name: row.try_get("full_name")?,
        phone_number: row.try_get("phone_number")?,
        state: State::try_from(state)?,
        cart: cart.0,
        meta: meta.0,
        calculator_meta: calculator_meta.0,
        catalog_offset: usize::try_from(offset)
            .map_err(|_| StoreError::Corrupted(format!("negative catalog offset {offset}")))?,
        last_edit_position: draft.map(|d| d.0),
    })
}

fn to_bigint(value: u64, column: &str) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::Corrupted(format!("{column} {value} does not fit BIGINT")))
}

fn from_bigint(value: i64, column: &str) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| StoreError::Corrupted(format!("negative {column} {value}")))
}

fn item_from_row(row: &PgRow) -> StoreResult<CatalogItem> {
    let image_urls: Json<Vec<String>> = row.try_get("image_urls")?;
    let available_sizes: Json<Vec<String>> = row.try_get("available_sizes")?;
    let available_in_city: Json<Vec<String>> = row.try_get("available_in_city")?;
    let rank: i32 = row.try_get("rank")?;
    let quantity: i32 = row.try_get("quantity")?;
    let price_rub: i64 = row.try_get("price_rub")?;

    Ok(CatalogItem {
        item_id: row.try_get("item_id")?,
        image_urls: image_urls.0,
        title: row.try_get("title")?,
        rank: rank as u32,
        available_sizes: available_sizes.0,
        available_in_city: available_in_city.0,
        quantity: quantity as u32,
        price_rub: from_bigint(price_rub, "price_rub")?,
        shop_link: row.try_get("shop_link")?,
    })
}

fn order_from_row(row: &PgRow) -> StoreResult<Order> {
    let customer: Json<OrderCustomer> = row.try_get("customer")?;
    let cart: Json<Cart> = row.try_get("cart")?;
    let amount_rub: i64 = row.try_get("amount_rub")?;
    let amount_yuan: i64 = row.try_get("amount_yuan")?;
    let status: String = row.try_get("status")?;

    Ok(Order {
        order_id: row.try_get("order_id")?,
        short_id: row.try_get("short_id")?,
        customer: customer.0,
        cart: cart.0,
        amount_rub: from_bigint(amount_rub, "amount_rub")?,
        amount_yuan: from_bigint(amount_yuan, "amount_yuan")?,
        delivery_address: row.try_get("delivery_address")?,
        is_express: row.try_get("is_express")?,
        is_paid: row.try_get("is_paid")?,
        is_approved: row.try_get("is_approved")?,
        status: OrderStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupted(format!("unknown order status {status:?}")))?,
        comment: row.try_get("comment")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn get_customer(&self, telegram_id: i64) -> StoreResult<Customer> {
        let row = sqlx::query("SELECT * FROM customers WHERE telegram_id = $1")
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::CustomerNotFound(telegram_id))?;
        customer_from_row(&row)
    }

    async fn save_customer(&self, customer: &Customer) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (telegram_id, username, full_name, phone_number, state, cart, meta,
                                   calculator_meta, catalog_offset, last_edit_position)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (telegram_id) DO UPDATE SET
                username = EXCLUDED.username,
                full_name = EXCLUDED.full_name,
                phone_number = EXCLUDED.phone_number,
                state = EXCLUDED.state,
                cart = EXCLUDED.cart,
                meta = EXCLUDED.meta,
                calculator_meta = EXCLUDED.calculator_meta,
                catalog_offset = EXCLUDED.catalog_offset,
                last_edit_position = EXCLUDED.last_edit_position
            "#,
        )
        .bind(customer.telegram_id)
        .bind(&customer.username)
        .bind(&customer.full_name)
        .bind(&customer.phone_number)
        .bind(i16::from(customer.state))
        .bind(Json(&customer.cart))
        .bind(Json(&customer.meta))
        .bind(Json(&customer.calculator_meta))
        .bind(customer.catalog_offset as i64)
        .bind(customer.last_edit_position.as_ref().map(Json))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_customer(&self, telegram_id: i64, update: CustomerUpdate) -> StoreResult<()> {
        if update.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE customers SET ");
        {
            let mut fields = builder.separated(", ");
            if let Some(state) = update.state {
                fields.push("state = ").push_bind_unseparated(i16::from(state));
            }
            if let Some(username) = update.username {
                fields.push("username = ").push_bind_unseparated(username);
            }
            if let Some(full_name) = update.full_name {
                fields.push("full_name = ").push_bind_unseparated(full_name);
            }
            if let Some(phone_number) = update.phone_number {
                fields.push("phone_number = ").push_bind_unseparated(phone_number);
            }
            if let Some(cart) = update.cart {
                fields.push("cart = ").push_bind_unseparated(Json(cart));
            }
            if let Some(meta) = update.meta {
                fields.push("meta = ").push_bind_unseparated(Json(meta));
            }
            if let Some(meta) = update.calculator_meta {
                fields.push("calculator_meta = ").push_bind_unseparated(Json(meta));
            }
            if let Some(offset) = update.catalog_offset {
                fields.push("catalog_offset = ").push_bind_unseparated(offset as i64);
            }
            if let Some(draft) = update.last_edit_position {
                fields
                    .push("last_edit_position = ")
                    .push_bind_unseparated(draft.map(Json));
            }
        }
        builder.push(" WHERE telegram_id = ").push_bind(telegram_id);

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::CustomerNotFound(telegram_id));
        }
        Ok(())
    }

    async fn update_state(&self, telegram_id: i64, state: State) -> StoreResult<()> {
        let result = sqlx::query("UPDATE customers SET state = $1 WHERE telegram_id = $2")
            .bind(i16::from(state))
            .bind(telegram_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::CustomerNotFound(telegram_id));
        }
        Ok(())
    }

    async fn nullify_catalog_offsets(&self) -> StoreResult<()> {
        sqlx::query("UPDATE customers SET catalog_offset = 0")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_catalog(&self) -> StoreResult<Vec<CatalogItem>> {
        let rows = sqlx::query("SELECT * FROM catalog ORDER BY rank ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn add_item(&self, item: CatalogItem) -> StoreResult<u32> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent appends; readers are not blocked
        sqlx::query("LOCK TABLE catalog IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let (rank,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO catalog (item_id, image_urls, title, rank, available_sizes, available_in_city,
                                 quantity, price_rub, shop_link)
            SELECT $1, $2, $3, COALESCE(MAX(rank) + 1, 0), $4, $5, $6, $7, $8 FROM catalog
            RETURNING rank
            "#,
        )
        .bind(item.item_id)
        .bind(Json(&item.image_urls))
        .bind(&item.title)
        .bind(Json(&item.available_sizes))
        .bind(Json(&item.available_in_city))
        .bind(item.quantity as i32)
        .bind(to_bigint(item.price_rub, "price_rub")?)
        .bind(&item.shop_link)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(item_id = %item.item_id, rank, "Added catalog item");
        self.notify().await?;
        Ok(rank as u32)
    }

    async fn remove_item(&self, item_id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let removed: Option<(i32,)> = sqlx::query_as("DELETE FROM catalog WHERE item_id = $1 RETURNING rank")
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await?;
        let (rank,) = removed.ok_or_else(|| StoreError::item_not_found(item_id))?;

        sqlx::query("UPDATE catalog SET rank = rank - 1 WHERE rank > $1")
            .bind(rank)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.notify().await
    }

    async fn update_ranks(&self, up_id: Uuid, down_id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let mut ranks = Vec::with_capacity(2);
        for item_id in [up_id, down_id] {
            let rank: Option<(i32,)> = sqlx::query_as("SELECT rank FROM catalog WHERE item_id = $1 FOR UPDATE")
                .bind(item_id)
                .fetch_optional(&mut *tx)
                .await?;
            let (rank,) = rank.ok_or_else(|| StoreError::item_not_found(item_id))?;
            ranks.push(rank);
        }

        for (item_id, rank) in [(up_id, ranks[1]), (down_id, ranks[0])] {
            sqlx::query("UPDATE catalog SET rank = $1 WHERE item_id = $2")
                .bind(rank)
                .bind(item_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        self.notify().await
    }

    async fn get_rank_by_id(&self, item_id: Uuid) -> StoreResult<u32> {
        let rank: Option<(i32,)> = sqlx::query_as("SELECT rank FROM catalog WHERE item_id = $1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        rank.map(|(r,)| r as u32)
            .ok_or_else(|| StoreError::item_not_found(item_id))
    }

    async fn get_id_by_rank(&self, rank: u32) -> StoreResult<Uuid> {
        let id: Option<(Uuid,)> = sqlx::query_as("SELECT item_id FROM catalog WHERE rank = $1")
            .bind(rank as i32)
            .fetch_optional(&self.pool)
            .await?;
        id.map(|(id,)| id)
            .ok_or_else(|| StoreError::ItemNotFound(format!("rank {rank}")))
    }

    async fn save_order(&self, order: &Order) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (order_id, short_id, customer_id, customer, cart, amount_rub, amount_yuan,
                                delivery_address, is_express, is_paid, is_approved, status, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(order.order_id)
        .bind(&order.short_id)
        .bind(order.customer.telegram_id)
        .bind(Json(&order.customer))
        .bind(Json(&order.cart))
        .bind(to_bigint(order.amount_rub, "amount_rub")?)
        .bind(to_bigint(order.amount_yuan, "amount_yuan")?)
        .bind(&order.delivery_address)
        .bind(order.is_express)
        .bind(order.is_paid)
        .bind(order.is_approved)
        .bind(order.status.as_str())
        .bind(&order.comment)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_order_by_short_id(&self, short_id: &str) -> StoreResult<Order> {
        let row = sqlx::query("SELECT * FROM orders WHERE short_id = $1")
            .bind(short_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::OrderNotFound(short_id.to_string()))?;
        order_from_row(&row)
    }

    async fn get_free_short_id(&self) -> StoreResult<String> {
        for _ in 0..SHORT_ID_ATTEMPTS {
            let candidate = generate_short_id();
            let (taken,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM orders WHERE short_id = $1)")
                .bind(&candidate)
                .fetch_one(&self.pool)
                .await?;
            if !taken {
                return Ok(candidate);
            }
        }
        Err(StoreError::Corrupted("short id space exhausted".to_string()))
    }

    async fn get_orders_for_customer(&self, telegram_id: i64) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query("SELECT * FROM orders WHERE customer_id = $1 ORDER BY created_at ASC")
            .bind(telegram_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn update_order_to_paid(&self, telegram_id: i64, short_id: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE orders SET is_paid = TRUE WHERE short_id = $1 AND customer_id = $2")
            .bind(short_id)
            .bind(telegram_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(short_id.to_string()));
        }
        Ok(())
    }
}
