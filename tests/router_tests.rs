//! Router loop: error replies, deadlines and shutdown

mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::{callback_event, text_event, MockChat, TestBot, USER_ID};
use poizon_bot::bot::{Command, Router};
use poizon_bot::callback::CallbackData;
use poizon_bot::chat::Event;
use tokio::sync::{mpsc, watch};

fn raw_callback(data: &str) -> Event {
    Event::Callback {
        chat_id: USER_ID,
        from: common::sender(),
        message_id: None,
        data: data.to_string(),
    }
}

/// Feeds `events` to a router and waits until it drained them
async fn run_to_completion(bot: &TestBot, events: Vec<Event>, timeout: Duration) {
    let (tx, rx) = mpsc::channel(16);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let router = Router::new(Arc::clone(&bot.handler), rx, shutdown_rx, timeout);
    for event in events {
        tx.send(event).await.unwrap();
    }
    drop(tx);
    router.run().await;
}

#[test]
fn test_command_parsing() {
    let bot = TestBot::new();
    let keyboards = bot.handler.keyboards();
    assert_eq!(Command::parse("/start", keyboards), Some(Command::Start));
    assert_eq!(Command::parse(" /menu ", keyboards), Some(Command::Menu));
    assert_eq!(Command::parse(&bot.t("button-cart"), keyboards), Some(Command::Cart));
    assert_eq!(
        Command::parse(&bot.t("button-add-position"), keyboards),
        Some(Command::AddPosition)
    );
    assert_eq!(Command::parse("/unknown", keyboards), None);
}

#[tokio::test]
async fn test_malformed_callback_gets_generic_reply() -> Result<()> {
    let bot = TestBot::new();
    run_to_completion(
        &bot,
        vec![raw_callback("x12"), raw_callback("999"), raw_callback("")],
        Duration::from_secs(5),
    )
    .await;

    let texts = bot.chat.texts();
    assert_eq!(texts.len(), 3);
    assert!(texts.iter().all(|t| *t == bot.t("error-generic")));
    Ok(())
}

#[tokio::test]
async fn test_failures_do_not_stop_the_loop() -> Result<()> {
    let bot = TestBot::new();
    run_to_completion(
        &bot,
        vec![
            text_event("no step is waiting for this"),
            callback_event(&CallbackData::bare(12), None),
            text_event("/menu"),
        ],
        Duration::from_secs(5),
    )
    .await;

    let texts = bot.chat.texts();
    assert_eq!(texts.iter().filter(|t| **t == bot.t("error-generic")).count(), 2);
    assert!(texts.contains(&bot.t("menu-title")));
    Ok(())
}

#[tokio::test]
async fn test_slow_handler_times_out() -> Result<()> {
    let bot = TestBot::with_chat(MockChat::with_delay(Duration::from_millis(200)));
    run_to_completion(&bot, vec![text_event("/menu")], Duration::from_millis(50)).await;

    // The menu never made it out; only the error reply did
    assert_eq!(bot.chat.texts(), vec![bot.t("error-generic")]);
    Ok(())
}

#[tokio::test]
async fn test_shutdown_stops_router() -> Result<()> {
    let bot = TestBot::new();
    let (_tx, rx) = mpsc::channel::<Event>(16);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let router = Router::new(Arc::clone(&bot.handler), rx, shutdown_rx, Duration::from_secs(5));
    let task = tokio::spawn(router.run());

    shutdown_tx.send(true)?;
    tokio::time::timeout(Duration::from_secs(1), task).await??;
    Ok(())
}
