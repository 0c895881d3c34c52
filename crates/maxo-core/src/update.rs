//! The update model.
//!
//! Every webhook push carries exactly one update, discriminated by its
//! `update_type` field:
//!
//! ```text
//! Update
//! ├── message_created / message_edited / message_removed
//! ├── message_callback
//! ├── bot_added / bot_removed / user_added / user_removed
//! ├── bot_started / bot_stopped
//! ├── chat_title_changed
//! └── dialog_muted / dialog_unmuted / dialog_cleared / dialog_removed
//! ```
//!
//! [`Update`] is a closed enum: a payload with an unknown `update_type`
//! fails to deserialize instead of falling back to a catch-all.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Callback, Message, User};

// ============================================================================
// UpdateType
// ============================================================================

/// Identifier of an update kind, as used in subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    MessageCreated,
    MessageEdited,
    MessageRemoved,
    MessageCallback,
    BotAdded,
    BotRemoved,
    UserAdded,
    UserRemoved,
    BotStarted,
    BotStopped,
    ChatTitleChanged,
    DialogMuted,
    DialogUnmuted,
    DialogCleared,
    DialogRemoved,
}

impl UpdateType {
    /// All known update types.
    pub const ALL: [UpdateType; 15] = [
        Self::MessageCreated,
        Self::MessageEdited,
        Self::MessageRemoved,
        Self::MessageCallback,
        Self::BotAdded,
        Self::BotRemoved,
        Self::UserAdded,
        Self::UserRemoved,
        Self::BotStarted,
        Self::BotStopped,
        Self::ChatTitleChanged,
        Self::DialogMuted,
        Self::DialogUnmuted,
        Self::DialogCleared,
        Self::DialogRemoved,
    ];

    /// Returns the wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageCreated => "message_created",
            Self::MessageEdited => "message_edited",
            Self::MessageRemoved => "message_removed",
            Self::MessageCallback => "message_callback",
            Self::BotAdded => "bot_added",
            Self::BotRemoved => "bot_removed",
            Self::UserAdded => "user_added",
            Self::UserRemoved => "user_removed",
            Self::BotStarted => "bot_started",
            Self::BotStopped => "bot_stopped",
            Self::ChatTitleChanged => "chat_title_changed",
            Self::DialogMuted => "dialog_muted",
            Self::DialogUnmuted => "dialog_unmuted",
            Self::DialogCleared => "dialog_cleared",
            Self::DialogRemoved => "dialog_removed",
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Update
// ============================================================================

/// One platform event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "update_type", rename_all = "snake_case")]
pub enum Update {
    MessageCreated(MessageCreated),
    MessageEdited(MessageEdited),
    MessageRemoved(MessageRemoved),
    MessageCallback(MessageCallback),
    BotAdded(BotAdded),
    BotRemoved(BotRemoved),
    UserAdded(UserAdded),
    UserRemoved(UserRemoved),
    BotStarted(BotStarted),
    BotStopped(BotStopped),
    ChatTitleChanged(ChatTitleChanged),
    DialogMuted(DialogMuted),
    DialogUnmuted(DialogUnmuted),
    DialogCleared(DialogCleared),
    DialogRemoved(DialogRemoved),
}

impl Update {
    /// Returns the kind of this update.
    pub fn update_type(&self) -> UpdateType {
        match self {
            Self::MessageCreated(_) => UpdateType::MessageCreated,
            Self::MessageEdited(_) => UpdateType::MessageEdited,
            Self::MessageRemoved(_) => UpdateType::MessageRemoved,
            Self::MessageCallback(_) => UpdateType::MessageCallback,
            Self::BotAdded(_) => UpdateType::BotAdded,
            Self::BotRemoved(_) => UpdateType::BotRemoved,
            Self::UserAdded(_) => UpdateType::UserAdded,
            Self::UserRemoved(_) => UpdateType::UserRemoved,
            Self::BotStarted(_) => UpdateType::BotStarted,
            Self::BotStopped(_) => UpdateType::BotStopped,
            Self::ChatTitleChanged(_) => UpdateType::ChatTitleChanged,
            Self::DialogMuted(_) => UpdateType::DialogMuted,
            Self::DialogUnmuted(_) => UpdateType::DialogUnmuted,
            Self::DialogCleared(_) => UpdateType::DialogCleared,
            Self::DialogRemoved(_) => UpdateType::DialogRemoved,
        }
    }

    /// Returns the event time (Unix ms).
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::MessageCreated(u) => u.timestamp,
            Self::MessageEdited(u) => u.timestamp,
            Self::MessageRemoved(u) => u.timestamp,
            Self::MessageCallback(u) => u.timestamp,
            Self::BotAdded(u) => u.timestamp,
            Self::BotRemoved(u) => u.timestamp,
            Self::UserAdded(u) => u.timestamp,
            Self::UserRemoved(u) => u.timestamp,
            Self::BotStarted(u) => u.timestamp,
            Self::BotStopped(u) => u.timestamp,
            Self::ChatTitleChanged(u) => u.timestamp,
            Self::DialogMuted(u) => u.timestamp,
            Self::DialogUnmuted(u) => u.timestamp,
            Self::DialogCleared(u) => u.timestamp,
            Self::DialogRemoved(u) => u.timestamp,
        }
    }

    /// Returns the message carried by this update, if any.
    pub fn message(&self) -> Option<&Message> {
        match self {
            Self::MessageCreated(u) => Some(&u.message),
            Self::MessageEdited(u) => Some(&u.message),
            Self::MessageCallback(u) => u.message.as_ref(),
            _ => None,
        }
    }
}

// ============================================================================
// Message updates
// ============================================================================

/// A new message was sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCreated {
    pub timestamp: i64,
    pub message: Message,
    #[serde(default)]
    pub user_locale: Option<String>,
}

/// A message was edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEdited {
    pub timestamp: i64,
    pub message: Message,
}

/// A message was deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRemoved {
    pub timestamp: i64,
    pub message_id: String,
    pub chat_id: i64,
    pub user_id: i64,
}

/// An inline button was pressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCallback {
    pub timestamp: i64,
    pub callback: Callback,
    /// The message the keyboard was attached to. May be absent if it was deleted.
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub user_locale: Option<String>,
}

// ============================================================================
// Membership updates
// ============================================================================

/// The bot was added to a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotAdded {
    pub timestamp: i64,
    pub chat_id: i64,
    /// Who added the bot.
    pub user: User,
    #[serde(default)]
    pub is_channel: bool,
}

/// The bot was removed from a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotRemoved {
    pub timestamp: i64,
    pub chat_id: i64,
    /// Who removed the bot.
    pub user: User,
    #[serde(default)]
    pub is_channel: bool,
}

/// A user joined or was added to a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAdded {
    pub timestamp: i64,
    pub chat_id: i64,
    pub user: User,
    /// Absent when the user joined by link.
    #[serde(default)]
    pub inviter_id: Option<i64>,
    #[serde(default)]
    pub is_channel: bool,
}

/// A user left or was removed from a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRemoved {
    pub timestamp: i64,
    pub chat_id: i64,
    pub user: User,
    /// Absent when the user left on their own.
    #[serde(default)]
    pub admin_id: Option<i64>,
    #[serde(default)]
    pub is_channel: bool,
}

// ============================================================================
// Bot lifecycle updates
// ============================================================================

/// A user pressed "Start" in a dialog with the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotStarted {
    pub timestamp: i64,
    pub chat_id: i64,
    pub user: User,
    /// Deep-link payload.
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub user_locale: Option<String>,
}

/// A user stopped the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotStopped {
    pub timestamp: i64,
    pub chat_id: i64,
    pub user: User,
    #[serde(default)]
    pub user_locale: Option<String>,
}

/// A chat title changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTitleChanged {
    pub timestamp: i64,
    pub chat_id: i64,
    pub user: User,
    pub title: String,
}

// ============================================================================
// Dialog updates
// ============================================================================

/// A user muted the dialog with the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogMuted {
    pub timestamp: i64,
    pub chat_id: i64,
    pub user: User,
    /// Mute end (Unix ms).
    pub muted_until: i64,
    #[serde(default)]
    pub user_locale: Option<String>,
}

/// A user unmuted the dialog with the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogUnmuted {
    pub timestamp: i64,
    pub chat_id: i64,
    pub user: User,
    #[serde(default)]
    pub user_locale: Option<String>,
}

/// A user cleared the dialog history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogCleared {
    pub timestamp: i64,
    pub chat_id: i64,
    pub user: User,
    #[serde(default)]
    pub user_locale: Option<String>,
}

/// A user deleted the dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogRemoved {
    pub timestamp: i64,
    pub chat_id: i64,
    pub user: User,
    #[serde(default)]
    pub user_locale: Option<String>,
}
