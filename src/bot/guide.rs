//! Four step ordering guide. Arrow buttons carry the album message ids so
//! each step replaces the pictures of the previous one.

use tracing::debug;

use super::ui_builder::{guide_buttons, GUIDE_STEPS, MAX_ALBUM_IMAGES};
use super::Handler;
use crate::chat::{Keyboard, Media};
use crate::errors::{BotError, BotResult};

impl Handler {
    fn guide_step_media(&self, step: u8) -> Vec<Media> {
        let urls: Vec<String> = self
            .settings
            .guide_step_images(step)
            .iter()
            .take(MAX_ALBUM_IMAGES)
            .cloned()
            .collect();
        Media::album(&urls, Some(self.texts.get(&format!("guide-step-{step}"))))
    }

    /// Shows guide step `step`. Without album ids (from the menu) a fresh
    /// album is sent; with them the existing album and controls are edited.
    pub async fn guide_step(
        &self,
        chat_id: i64,
        step: u8,
        album_ids: &[i32],
        control_message_id: Option<i32>,
    ) -> BotResult<()> {
        if !(1..=GUIDE_STEPS).contains(&step) {
            return Err(BotError::InvalidUpdate);
        }
        let media = self.guide_step_media(step);
        let step_text = format!("guide-step-{step}");

        if album_ids.is_empty() || control_message_id.is_none() {
            let album_ids = if media.is_empty() {
                Vec::new()
            } else {
                self.chat.send_media_group(chat_id, media).await?
            };
            let buttons = guide_buttons(&self.texts, step, &album_ids)?;
            self.send_with_keyboard(chat_id, &step_text, Keyboard::Inline(buttons))
                .await?;
            return Ok(());
        }

        debug!(user_id = %chat_id, step, "Editing guide album in place");
        let mut kept_ids = Vec::with_capacity(album_ids.len());
        for (i, message_id) in album_ids.iter().enumerate() {
            match media.get(i) {
                Some(item) => {
                    self.chat
                        .edit_message_media(chat_id, *message_id, item.clone())
                        .await?;
                    kept_ids.push(*message_id);
                }
                None => self.chat.delete_message(chat_id, *message_id).await?,
            }
        }

        let buttons = guide_buttons(&self.texts, step, &kept_ids)?;
        if let Some(message_id) = control_message_id {
            self.chat.edit_message_buttons(chat_id, message_id, buttons).await?;
        }
        Ok(())
    }
}
