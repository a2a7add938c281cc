//! Message content type.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Content type of a message.
///
/// For [`Image`](ContentType::Image) and [`Video`](ContentType::Video)
/// messages the `text` column holds the opaque attachment key rather than
/// message content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    /// Plain text message.
    #[sea_orm(string_value = "TEXT")]
    Text,
    /// JPEG image attachment.
    #[sea_orm(string_value = "IMAGE")]
    Image,
    /// MP4 video attachment.
    #[sea_orm(string_value = "VIDEO")]
    Video,
}

impl ContentType {
    /// Whether this message carries an attachment key instead of text.
    #[must_use]
    pub const fn is_attachment(self) -> bool {
        matches!(self, Self::Image | Self::Video)
    }
}
