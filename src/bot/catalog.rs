//! Catalog browsing: an album of the current item plus a control message
//! whose arrows edit that album in place

use tracing::debug;

use super::ui_builder::{catalog_buttons, MAX_ALBUM_IMAGES};
use super::Handler;
use crate::chat::{Keyboard, Media};
use crate::domain::{CatalogItem, Customer};
use crate::errors::BotResult;
use crate::store::CustomerUpdate;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

fn album_urls(item: &CatalogItem) -> Vec<String> {
    item.image_urls.iter().take(MAX_ALBUM_IMAGES).cloned().collect()
}

impl Handler {
    /// Sends the item as an album and returns the album message ids. Items
    /// without pictures are sent as plain text and yield no ids.
    async fn send_item(&self, chat_id: i64, item: &CatalogItem) -> BotResult<Vec<i32>> {
        let album = Media::album(&album_urls(item), Some(item.caption()));
        if album.is_empty() {
            self.chat.send_text(chat_id, &item.caption(), None).await?;
            return Ok(Vec::new());
        }
        Ok(self.chat.send_media_group(chat_id, album).await?)
    }

    fn neighbours(&self, offset: usize) -> (Option<CatalogItem>, Option<CatalogItem>) {
        let prev = self
            .catalog
            .has_prev(offset)
            .then(|| self.catalog.load_prev(offset));
        let next = self
            .catalog
            .has_next(offset)
            .then(|| self.catalog.load_next(offset));
        (prev, next)
    }

    pub async fn catalog(&self, chat_id: i64, customer: &Customer) -> BotResult<()> {
        let offset = self.catalog.clamp_offset(customer.catalog_offset);
        let item = self.catalog.load_at(offset);
        if item.is_sentinel() {
            self.send(chat_id, "catalog-empty").await?;
            return Ok(());
        }

        let message_ids = self.send_item(chat_id, &item).await?;

        let (prev, next) = self.neighbours(offset);
        let buttons = catalog_buttons(&self.texts, prev.as_ref(), next.as_ref(), &message_ids)?;
        self.send_with_keyboard(chat_id, "catalog-controls", Keyboard::Inline(buttons))
            .await?;

        if offset != customer.catalog_offset {
            self.store
                .update_customer(customer.telegram_id, CustomerUpdate::new().catalog_offset(offset))
                .await?;
        }
        Ok(())
    }

    /// Moves the customer's cursor and edits the album messages in place.
    /// Album messages the new item has no picture for are deleted.
    pub async fn catalog_step(
        &self,
        chat_id: i64,
        customer: &Customer,
        direction: Direction,
        album_ids: &[i32],
        control_message_id: Option<i32>,
    ) -> BotResult<()> {
        let offset = self.catalog.clamp_offset(customer.catalog_offset);
        let (available, new_offset) = match direction {
            Direction::Next => (self.catalog.has_next(offset), offset + 1),
            Direction::Prev => (self.catalog.has_prev(offset), offset.wrapping_sub(1)),
        };
        if !available {
            debug!(user_id = %customer.telegram_id, offset, ?direction, "Catalog boundary reached");
            return Ok(());
        }

        let item = self.catalog.load_at(new_offset);
        let urls = album_urls(&item);
        let caption = item.caption();

        let mut kept_ids = Vec::with_capacity(album_ids.len());
        if album_ids.is_empty() {
            kept_ids = self.send_item(chat_id, &item).await?;
        }
        for (i, message_id) in album_ids.iter().enumerate() {
            match urls.get(i) {
                Some(url) => {
                    let media = Media {
                        url: url.clone(),
                        caption: (i == 0).then(|| caption.clone()),
                    };
                    self.chat.edit_message_media(chat_id, *message_id, media).await?;
                    kept_ids.push(*message_id);
                }
                None => self.chat.delete_message(chat_id, *message_id).await?,
            }
        }

        self.store
            .update_customer(customer.telegram_id, CustomerUpdate::new().catalog_offset(new_offset))
            .await?;

        let (prev, next) = self.neighbours(new_offset);
        let buttons = catalog_buttons(&self.texts, prev.as_ref(), next.as_ref(), &kept_ids)?;
        match control_message_id {
            Some(message_id) => self.chat.edit_message_buttons(chat_id, message_id, buttons).await?,
            None => {
                self.send_with_keyboard(chat_id, "catalog-controls", Keyboard::Inline(buttons))
                    .await?;
            }
        }
        Ok(())
    }
}
