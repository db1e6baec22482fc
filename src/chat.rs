//! Chat transport seam: outbound operations the handlers need and the inbound
//! event union the router consumes.

use async_trait::async_trait;

use crate::callback::CallbackData;
use crate::errors::{CallbackError, ChatError};

pub type ChatResult<T> = Result<T, ChatError>;

/// The user that produced an inbound event
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sender {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

/// Inbound update, already stripped of transport details
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Text {
        chat_id: i64,
        from: Sender,
        text: String,
    },
    Callback {
        chat_id: i64,
        from: Sender,
        /// Message the pressed button is attached to
        message_id: Option<i32>,
        data: String,
    },
}

impl Event {
    pub fn chat_id(&self) -> i64 {
        match self {
            Event::Text { chat_id, .. } | Event::Callback { chat_id, .. } => *chat_id,
        }
    }

    pub fn sender(&self) -> &Sender {
        match self {
            Event::Text { from, .. } | Event::Callback { from, .. } => from,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, data: &CallbackData) -> Result<Self, CallbackError> {
        Ok(Self {
            text: text.into(),
            data: data.encode()?,
        })
    }
}

pub type InlineRows = Vec<Vec<InlineButton>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Keyboard {
    Inline(InlineRows),
    /// Persistent keyboard under the input field; pressing a key sends its label as text
    Reply(Vec<Vec<String>>),
}

/// A photo referenced by URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Media {
    pub url: String,
    pub caption: Option<String>,
}

impl Media {
    /// Photos for a media group; the caption goes on the first one
    pub fn album(urls: &[String], caption: Option<String>) -> Vec<Media> {
        urls.iter()
            .enumerate()
            .map(|(i, url)| Media {
                url: url.clone(),
                caption: if i == 0 { caption.clone() } else { None },
            })
            .collect()
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Returns the id of the sent message
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> ChatResult<i32>;
    /// Returns the ids of the sent messages in album order
    async fn send_media_group(&self, chat_id: i64, media: Vec<Media>) -> ChatResult<Vec<i32>>;
    async fn edit_message_media(&self, chat_id: i64, message_id: i32, media: Media) -> ChatResult<()>;
    async fn edit_message_buttons(&self, chat_id: i64, message_id: i32, buttons: InlineRows) -> ChatResult<()>;
    async fn delete_message(&self, chat_id: i64, message_id: i32) -> ChatResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_album_caption_on_first_photo() {
        let urls = vec!["https://a/1.jpg".to_string(), "https://a/2.jpg".to_string()];
        let album = Media::album(&urls, Some("caption".to_string()));
        assert_eq!(album.len(), 2);
        assert_eq!(album[0].caption.as_deref(), Some("caption"));
        assert_eq!(album[1].caption, None);
    }

    #[test]
    fn test_inline_button_encodes_data() {
        let button = InlineButton::new("next", &CallbackData::with_message_ids(1201, vec![7, 8])).unwrap();
        assert_eq!(button.data, "m7,8:1201");
    }
}
