//! Catalog administration and browsing

mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{Sent, TestBot};
use poizon_bot::callback::{Callback, CallbackData, CATALOG_NEXT, CATALOG_PREV};
use poizon_bot::catalog::CatalogManager;
use poizon_bot::chat::Keyboard;
use poizon_bot::domain::{CatalogItem, Customer};
use poizon_bot::store::{CustomerUpdate, Store};

fn item(title: &str, images: usize) -> CatalogItem {
    let urls = (0..images)
        .map(|i| format!("https://cdn.example.com/{title}/{i}.jpg"))
        .collect();
    CatalogItem::new(title, urls)
}

async fn seed(bot: &TestBot, items: Vec<CatalogItem>) -> Result<Vec<CatalogItem>> {
    let manager = CatalogManager::new(bot.store.clone());
    for item in items {
        manager.add_item(item).await?;
    }
    Ok(bot.store.get_catalog().await?)
}

fn titles(items: &[CatalogItem]) -> Vec<&str> {
    items.iter().map(|i| i.title.as_str()).collect()
}

#[tokio::test]
async fn test_add_item_appends_with_next_rank() -> Result<()> {
    let bot = TestBot::new();
    let manager = CatalogManager::new(bot.store.clone());
    assert_eq!(manager.add_item(item("a", 1)).await?, 0);
    assert_eq!(manager.add_item(item("b", 1)).await?, 1);
    assert_eq!(manager.add_item(item("c", 1)).await?, 2);

    let catalog = bot.store.get_catalog().await?;
    assert_eq!(catalog.iter().map(|i| i.rank).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(bot.cache.len(), 3);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_get_distinct_ranks() -> Result<()> {
    let bot = TestBot::new();
    let manager = Arc::new(CatalogManager::new(bot.store.clone()));

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..16 {
        let manager = Arc::clone(&manager);
        tasks.spawn(async move { manager.add_item(item(&format!("item-{i}"), 1)).await });
    }
    let mut ranks = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        ranks.push(joined??);
    }
    ranks.sort_unstable();
    assert_eq!(ranks, (0..16).collect::<Vec<u32>>());

    let catalog = bot.store.get_catalog().await?;
    assert_eq!(catalog.iter().map(|i| i.rank).collect::<Vec<_>>(), (0..16).collect::<Vec<u32>>());
    Ok(())
}

#[tokio::test]
async fn test_remove_item_keeps_ranks_contiguous() -> Result<()> {
    let bot = TestBot::new();
    let catalog = seed(&bot, vec![item("a", 1), item("b", 1), item("c", 1)]).await?;

    let manager = CatalogManager::new(bot.store.clone());
    manager.remove_item(catalog[1].item_id).await?;

    let catalog = bot.store.get_catalog().await?;
    assert_eq!(titles(&catalog), vec!["a", "c"]);
    assert_eq!(catalog.iter().map(|i| i.rank).collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(bot.cache.len(), 2);
    assert_eq!(bot.cache.load_at(1).title, "c");
    Ok(())
}

#[tokio::test]
async fn test_rank_up_and_down() -> Result<()> {
    let bot = TestBot::new();
    let catalog = seed(&bot, vec![item("a", 1), item("b", 1), item("c", 1)]).await?;
    let manager = CatalogManager::new(bot.store.clone());

    manager.rank_up(catalog[2].item_id).await?;
    assert_eq!(titles(&bot.store.get_catalog().await?), vec!["a", "c", "b"]);

    manager.rank_down(catalog[0].item_id).await?;
    assert_eq!(titles(&bot.store.get_catalog().await?), vec!["c", "a", "b"]);

    // Already at the edges
    manager.rank_up(catalog[2].item_id).await?;
    manager.rank_down(catalog[1].item_id).await?;
    assert_eq!(titles(&bot.store.get_catalog().await?), vec!["c", "a", "b"]);
    Ok(())
}

#[tokio::test]
async fn test_catalog_change_resets_offsets() -> Result<()> {
    let bot = TestBot::new();
    seed(&bot, vec![item("a", 1), item("b", 1), item("c", 1)]).await?;

    bot.store.save_customer(&Customer::new(7, "someone")).await?;
    bot.store
        .update_customer(7, CustomerUpdate::new().catalog_offset(2))
        .await?;

    let manager = CatalogManager::new(bot.store.clone());
    manager.add_item(item("d", 1)).await?;
    assert_eq!(bot.store.get_customer(7).await?.catalog_offset, 0);
    Ok(())
}

#[tokio::test]
async fn test_empty_catalog() -> Result<()> {
    let bot = TestBot::new();
    bot.press(Callback::Catalog).await?;
    assert_eq!(bot.chat.last_text().unwrap(), bot.t("catalog-empty"));
    Ok(())
}

#[tokio::test]
async fn test_browse_catalog_edits_album_in_place() -> Result<()> {
    let bot = TestBot::new();
    seed(&bot, vec![item("a", 2), item("b", 1)]).await?;

    bot.press(Callback::Catalog).await?;
    let sent = bot.chat.sent();
    let Sent::Album { media, .. } = &sent[0] else {
        panic!("expected an album, got {:?}", sent[0]);
    };
    assert_eq!(media.len(), 2);
    assert!(media[0].caption.as_deref().unwrap().starts_with('a'));

    // The album got ids 100 and 101, the control message 102
    let Some(Keyboard::Inline(rows)) = bot.chat.last_keyboard() else {
        panic!("expected inline controls");
    };
    let next = CallbackData::decode(&rows[0][0].data)?;
    assert_eq!(next.code, CATALOG_NEXT);
    assert_eq!(next.message_ids(), &[100, 101]);
    assert_eq!(rows[0].len(), 1);

    bot.chat.clear();
    bot.press_data(&next, Some(102)).await?;
    let sent = bot.chat.sent();
    assert!(matches!(&sent[0], Sent::EditMedia { message_id: 100, .. }));
    assert_eq!(sent[1], Sent::Delete { message_id: 101 });
    let Sent::EditButtons { message_id: 102, buttons } = &sent[2] else {
        panic!("expected controls to be edited, got {:?}", sent[2]);
    };
    let prev = CallbackData::decode(&buttons[0][0].data)?;
    assert_eq!(prev.code, CATALOG_PREV);
    assert_eq!(prev.message_ids(), &[100]);
    assert_eq!(bot.customer().await.catalog_offset, 1);

    // No item after the last one
    bot.chat.clear();
    bot.press_data(&CallbackData::with_message_ids(CATALOG_NEXT, vec![100]), Some(102))
        .await?;
    assert!(bot.chat.sent().is_empty());
    assert_eq!(bot.customer().await.catalog_offset, 1);
    Ok(())
}

#[tokio::test]
async fn test_stale_offset_is_clamped() -> Result<()> {
    let bot = TestBot::new();
    seed(&bot, vec![item("a", 1)]).await?;
    bot.press(Callback::Menu).await?;
    bot.store
        .update_customer(common::USER_ID, CustomerUpdate::new().catalog_offset(5))
        .await?;

    bot.press(Callback::Catalog).await?;
    assert_eq!(bot.customer().await.catalog_offset, 0);
    assert!(bot.chat.sent().iter().any(|s| matches!(s, Sent::Album { .. })));
    Ok(())
}

#[tokio::test]
async fn test_listener_receives_sorted_catalog() -> Result<()> {
    let bot = TestBot::new();
    let catalog = seed(&bot, vec![item("a", 0), item("b", 0)]).await?;
    let manager = CatalogManager::new(Arc::clone(&bot.store) as Arc<dyn Store>);
    manager.rank_down(catalog[0].item_id).await?;

    assert_eq!(bot.cache.load_at(0).title, "b");
    assert_eq!(bot.cache.load_at(1).title, "a");
    assert!(bot.cache.load_at(2).is_sentinel());
    Ok(())
}
