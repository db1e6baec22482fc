//! Telegram side of the chat seam: a [`ChatClient`] on top of `teloxide::Bot`
//! and the dispatcher that turns updates into router [`Event`]s.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, InputFile, InputMedia, InputMediaPhoto, KeyboardButton,
    KeyboardMarkup, MessageId, User,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chat::{ChatClient, ChatResult, Event, InlineRows, Keyboard, Media, Sender};
use crate::errors::ChatError;

#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn inline_markup(rows: InlineRows) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.into_iter().map(|row| {
        row.into_iter()
            .map(|button| InlineKeyboardButton::callback(button.text, button.data))
            .collect::<Vec<_>>()
    }))
}

fn input_photo(media: Media) -> ChatResult<InputMedia> {
    let url = reqwest::Url::parse(&media.url).map_err(|_| ChatError::InvalidUrl(media.url.clone()))?;
    let mut photo = InputMediaPhoto::new(InputFile::url(url));
    if let Some(caption) = media.caption {
        photo = photo.caption(caption);
    }
    Ok(InputMedia::Photo(photo))
}

#[async_trait]
impl ChatClient for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> ChatResult<i32> {
        let request = self.bot.send_message(ChatId(chat_id), text);
        let message = match keyboard {
            None => request.await?,
            Some(Keyboard::Inline(rows)) => request.reply_markup(inline_markup(rows)).await?,
            Some(Keyboard::Reply(rows)) => {
                let markup = KeyboardMarkup::new(
                    rows.into_iter()
                        .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>()),
                );
                request.reply_markup(markup).await?
            }
        };
        Ok(message.id.0)
    }

    async fn send_media_group(&self, chat_id: i64, media: Vec<Media>) -> ChatResult<Vec<i32>> {
        let media = media.into_iter().map(input_photo).collect::<ChatResult<Vec<_>>>()?;
        let messages = self.bot.send_media_group(ChatId(chat_id), media).await?;
        Ok(messages.iter().map(|m| m.id.0).collect())
    }

    async fn edit_message_media(&self, chat_id: i64, message_id: i32, media: Media) -> ChatResult<()> {
        self.bot
            .edit_message_media(ChatId(chat_id), MessageId(message_id), input_photo(media)?)
            .await?;
        Ok(())
    }

    async fn edit_message_buttons(&self, chat_id: i64, message_id: i32, buttons: InlineRows) -> ChatResult<()> {
        self.bot
            .edit_message_reply_markup(ChatId(chat_id), MessageId(message_id))
            .reply_markup(inline_markup(buttons))
            .await?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> ChatResult<()> {
        self.bot.delete_message(ChatId(chat_id), MessageId(message_id)).await?;
        Ok(())
    }
}

fn sender(user: &User) -> Sender {
    Sender {
        id: user.id.0 as i64,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
    }
}

async fn forward(events: &mpsc::Sender<Event>, event: Event) {
    if let Err(e) = events.send(event).await {
        warn!(error = %e, "Router is gone, dropping update");
    }
}

async fn message_endpoint(msg: Message, events: mpsc::Sender<Event>) -> ResponseResult<()> {
    let (Some(text), Some(user)) = (msg.text(), msg.from.as_ref()) else {
        debug!(chat_id = %msg.chat.id, "Ignoring non-text message");
        return Ok(());
    };

    let event = Event::Text {
        chat_id: msg.chat.id.0,
        from: sender(user),
        text: text.to_string(),
    };
    forward(&events, event).await;
    Ok(())
}

async fn callback_endpoint(bot: Bot, q: CallbackQuery, events: mpsc::Sender<Event>) -> ResponseResult<()> {
    // Acknowledge right away so the client stops the button spinner
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!(user_id = %q.from.id, error = %e, "Failed to answer callback query");
    }

    let Some(data) = q.data.clone() else {
        return Ok(());
    };

    let event = Event::Callback {
        chat_id: q
            .message
            .as_ref()
            .map(|m| m.chat().id.0)
            .unwrap_or(q.from.id.0 as i64),
        from: sender(&q.from),
        message_id: q.message.as_ref().map(|m| m.id().0),
        data,
    };
    forward(&events, event).await;
    Ok(())
}

/// Long-polls Telegram and pushes every text message and callback query onto
/// `events` until Ctrl-C is received.
pub async fn run_ingress(bot: Bot, events: mpsc::Sender<Event>) {
    info!("Starting Telegram dispatcher");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(message_endpoint))
        .branch(Update::filter_callback_query().endpoint(callback_endpoint));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![events])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Telegram dispatcher stopped");
}
