//! Platform object types carried inside updates.
//!
//! Only the shapes the update model needs are typed here. Attachment and
//! markup payloads stay as raw JSON: their rendering belongs to the
//! serialization layer, not to update ingestion.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Users and chats
// ============================================================================

/// A platform user (or bot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub user_id: i64,
    /// First name.
    pub first_name: String,
    /// Last name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Public username, if set.
    #[serde(default)]
    pub username: Option<String>,
    /// Whether the user is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// Last activity time (Unix ms).
    #[serde(default)]
    pub last_activity_time: Option<i64>,
}

/// Chat kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    Dialog,
    Chat,
    Channel,
    /// A chat kind this version does not know about.
    #[serde(other)]
    Unknown,
}

/// Where a message was sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    /// Chat ID.
    #[serde(default)]
    pub chat_id: Option<i64>,
    /// Chat kind.
    pub chat_type: ChatType,
    /// User ID for dialogs.
    #[serde(default)]
    pub user_id: Option<i64>,
}

// ============================================================================
// Messages
// ============================================================================

/// Message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    /// Message ID.
    pub mid: String,
    /// Sequence number within the chat.
    pub seq: i64,
    /// Text content.
    #[serde(default)]
    pub text: Option<String>,
    /// Raw attachments.
    #[serde(default)]
    pub attachments: Option<Vec<Value>>,
    /// Raw text markup elements.
    #[serde(default)]
    pub markup: Option<Vec<Value>>,
}

/// How a linked message relates to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLinkType {
    Forward,
    Reply,
}

/// A forwarded or replied-to message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedMessage {
    /// Link kind.
    #[serde(rename = "type")]
    pub link_type: MessageLinkType,
    /// Original sender.
    #[serde(default)]
    pub sender: Option<User>,
    /// Original chat.
    #[serde(default)]
    pub chat_id: Option<i64>,
    /// Original content.
    pub message: MessageBody,
}

/// Channel message statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStat {
    pub views: i64,
}

/// A message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Sender. Absent for channel posts.
    #[serde(default)]
    pub sender: Option<User>,
    /// Recipient chat.
    pub recipient: Recipient,
    /// Creation time (Unix ms).
    pub timestamp: i64,
    /// Forwarded or replied message.
    #[serde(default)]
    pub link: Option<LinkedMessage>,
    /// Content.
    pub body: MessageBody,
    /// Statistics (channels only).
    #[serde(default)]
    pub stat: Option<MessageStat>,
    /// Public URL (channels only).
    #[serde(default)]
    pub url: Option<String>,
}

impl Message {
    /// Returns the text content, if any.
    pub fn text(&self) -> Option<&str> {
        self.body.text.as_deref()
    }

    /// Returns the chat this message belongs to.
    pub fn chat_id(&self) -> Option<i64> {
        self.recipient.chat_id
    }
}

/// An inline-keyboard button press.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Callback {
    /// Press time (Unix ms).
    pub timestamp: i64,
    /// Callback ID used to answer the press.
    pub callback_id: String,
    /// Button payload.
    #[serde(default)]
    pub payload: Option<String>,
    /// Who pressed the button.
    pub user: User,
}
