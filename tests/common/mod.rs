//! Shared harness: a recording chat client and a handler wired to the
//! in-memory store with a fixed yuan rate of 1.0
#![allow(dead_code)]

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use poizon_bot::bot::{dispatch, Handler};
use poizon_bot::callback::{Callback, CallbackData};
use poizon_bot::catalog::CatalogCache;
use poizon_bot::chat::{ChatClient, ChatResult, Event, InlineRows, Keyboard, Media, Sender};
use poizon_bot::config::BotSettings;
use poizon_bot::dialogue::State;
use poizon_bot::domain::{CatalogItem, Customer, Order};
use poizon_bot::errors::{BotResult, StoreError};
use poizon_bot::localization::Texts;
use poizon_bot::pricing::{FixedRateProvider, PricingEngine};
use poizon_bot::store::{CatalogListener, CustomerUpdate, MemoryStore, Store, StoreResult};

pub const USER_ID: i64 = 42;
pub const SHOP_LINK: &str = "https://dw4.co/t/A/1a2b3c";

#[derive(Clone, Debug, PartialEq)]
pub enum Sent {
    Text {
        chat_id: i64,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Album {
        chat_id: i64,
        media: Vec<Media>,
    },
    EditMedia {
        message_id: i32,
        media: Media,
    },
    EditButtons {
        message_id: i32,
        buttons: InlineRows,
    },
    Delete {
        message_id: i32,
    },
}

/// Records every outbound call. Message ids are handed out from 100 upwards.
pub struct MockChat {
    sent: Mutex<Vec<Sent>>,
    next_id: AtomicI32,
    delay: Option<Duration>,
}

impl MockChat {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(100),
            delay: None,
        }
    }

    /// Every call sleeps for `delay` before it is recorded
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    async fn record(&self, sent: Sent) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sent.lock().unwrap().push(sent);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts().pop()
    }

    /// Keyboard of the most recent text message
    pub fn last_keyboard(&self) -> Option<Keyboard> {
        self.sent().into_iter().rev().find_map(|s| match s {
            Sent::Text { keyboard, .. } => Some(keyboard),
            _ => None,
        })?
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl ChatClient for MockChat {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> ChatResult<i32> {
        self.record(Sent::Text {
            chat_id,
            text: text.to_string(),
            keyboard,
        })
        .await;
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn send_media_group(&self, chat_id: i64, media: Vec<Media>) -> ChatResult<Vec<i32>> {
        let ids = media
            .iter()
            .map(|_| self.next_id.fetch_add(1, Ordering::SeqCst))
            .collect();
        self.record(Sent::Album { chat_id, media }).await;
        Ok(ids)
    }

    async fn edit_message_media(&self, _chat_id: i64, message_id: i32, media: Media) -> ChatResult<()> {
        self.record(Sent::EditMedia { message_id, media }).await;
        Ok(())
    }

    async fn edit_message_buttons(&self, _chat_id: i64, message_id: i32, buttons: InlineRows) -> ChatResult<()> {
        self.record(Sent::EditButtons { message_id, buttons }).await;
        Ok(())
    }

    async fn delete_message(&self, _chat_id: i64, message_id: i32) -> ChatResult<()> {
        self.record(Sent::Delete { message_id }).await;
        Ok(())
    }
}

/// Memory store whose order writes always fail
pub struct FailingOrders {
    pub inner: Arc<MemoryStore>,
}

#[async_trait]
impl Store for FailingOrders {
    async fn get_customer(&self, telegram_id: i64) -> StoreResult<Customer> {
        self.inner.get_customer(telegram_id).await
    }

    async fn save_customer(&self, customer: &Customer) -> StoreResult<()> {
        self.inner.save_customer(customer).await
    }

    async fn update_customer(&self, telegram_id: i64, update: CustomerUpdate) -> StoreResult<()> {
        self.inner.update_customer(telegram_id, update).await
    }

    async fn update_state(&self, telegram_id: i64, state: State) -> StoreResult<()> {
        self.inner.update_state(telegram_id, state).await
    }

    async fn nullify_catalog_offsets(&self) -> StoreResult<()> {
        self.inner.nullify_catalog_offsets().await
    }

    async fn get_catalog(&self) -> StoreResult<Vec<CatalogItem>> {
        self.inner.get_catalog().await
    }

    async fn add_item(&self, item: CatalogItem) -> StoreResult<u32> {
        self.inner.add_item(item).await
    }

    async fn remove_item(&self, item_id: Uuid) -> StoreResult<()> {
        self.inner.remove_item(item_id).await
    }

    async fn update_ranks(&self, up_id: Uuid, down_id: Uuid) -> StoreResult<()> {
        self.inner.update_ranks(up_id, down_id).await
    }

    async fn get_rank_by_id(&self, item_id: Uuid) -> StoreResult<u32> {
        self.inner.get_rank_by_id(item_id).await
    }

    async fn get_id_by_rank(&self, rank: u32) -> StoreResult<Uuid> {
        self.inner.get_id_by_rank(rank).await
    }

    async fn save_order(&self, _order: &Order) -> StoreResult<()> {
        Err(StoreError::Corrupted("orders are unavailable".to_string()))
    }

    async fn get_order_by_short_id(&self, short_id: &str) -> StoreResult<Order> {
        self.inner.get_order_by_short_id(short_id).await
    }

    async fn get_free_short_id(&self) -> StoreResult<String> {
        self.inner.get_free_short_id().await
    }

    async fn get_orders_for_customer(&self, telegram_id: i64) -> StoreResult<Vec<Order>> {
        self.inner.get_orders_for_customer(telegram_id).await
    }

    async fn update_order_to_paid(&self, telegram_id: i64, short_id: &str) -> StoreResult<()> {
        self.inner.update_order_to_paid(telegram_id, short_id).await
    }
}

/// Handler over an arbitrary store, with the same chat, texts and rate as [`TestBot`]
pub fn handler_with_store(store: Arc<dyn Store>, chat: Arc<MockChat>) -> Handler {
    Handler::new(
        store,
        chat,
        Arc::new(CatalogCache::new()),
        PricingEngine::new(Arc::new(FixedRateProvider::new(1.0))),
        Arc::new(Texts::embedded().unwrap()),
        Arc::new(BotSettings::default()),
    )
    .unwrap()
}

pub struct TestBot {
    pub handler: Arc<Handler>,
    pub store: Arc<MemoryStore>,
    pub chat: Arc<MockChat>,
    pub cache: Arc<CatalogCache>,
    pub texts: Arc<Texts>,
}

impl TestBot {
    pub fn new() -> Self {
        Self::with_chat(MockChat::new())
    }

    pub fn with_chat(chat: MockChat) -> Self {
        Self::build(chat, BotSettings::default())
    }

    pub fn with_settings(settings: BotSettings) -> Self {
        Self::build(MockChat::new(), settings)
    }

    fn build(chat: MockChat, settings: BotSettings) -> Self {
        let cache = Arc::new(CatalogCache::new());
        let listener: CatalogListener = {
            let cache = Arc::clone(&cache);
            Arc::new(move |items: &[CatalogItem]| cache.load(items))
        };
        let store = Arc::new(MemoryStore::with_catalog_listener(listener));
        let chat = Arc::new(chat);
        let texts = Arc::new(Texts::embedded().unwrap());
        let handler = Handler::new(
            store.clone(),
            chat.clone(),
            Arc::clone(&cache),
            PricingEngine::new(Arc::new(FixedRateProvider::new(1.0))),
            Arc::clone(&texts),
            Arc::new(settings),
        )
        .unwrap();

        Self {
            handler: Arc::new(handler),
            store,
            chat,
            cache,
            texts,
        }
    }

    pub async fn dispatch(&self, event: Event) -> BotResult<()> {
        dispatch(&self.handler, &event).await
    }

    pub async fn text(&self, text: &str) -> BotResult<()> {
        self.dispatch(text_event(text)).await
    }

    pub async fn press(&self, callback: Callback) -> BotResult<()> {
        self.dispatch(callback_event(&callback.data()?, None)).await
    }

    pub async fn press_data(&self, data: &CallbackData, message_id: Option<i32>) -> BotResult<()> {
        self.dispatch(callback_event(data, message_id)).await
    }

    pub async fn customer(&self) -> Customer {
        self.store.get_customer(USER_ID).await.unwrap()
    }

    pub fn t(&self, key: &str) -> String {
        self.texts.get(key)
    }
}

pub fn sender() -> Sender {
    Sender {
        id: USER_ID,
        first_name: "Ivan".to_string(),
        last_name: None,
        username: Some("ivan".to_string()),
    }
}

pub fn text_event(text: &str) -> Event {
    Event::Text {
        chat_id: USER_ID,
        from: sender(),
        text: text.to_string(),
    }
}

pub fn callback_event(data: &CallbackData, message_id: Option<i32>) -> Event {
    Event::Callback {
        chat_id: USER_ID,
        from: sender(),
        message_id,
        data: data.encode().unwrap(),
    }
}
