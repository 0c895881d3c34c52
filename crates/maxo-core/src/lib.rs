//! # Maxo Core
//!
//! Shared building blocks of the maxo bot framework for the MAX messenger
//! Bot API.
//!
//! - **Update model**: the closed [`Update`] enum and its payload types
//! - **Bot contract**: the outbound API client seen through [`Bot`]
//! - **Dispatcher contract**: the handler pipeline seen through [`Dispatcher`]
//! - **Method descriptors**: typed requests such as [`Subscribe`]
//!
//! ```text
//! ┌──────────────┐  UpdateEnvelope  ┌────────────┐  MethodCall  ┌──────────┐
//! │ WebhookEngine│─────────────────▶│ Dispatcher │─────────────▶│   Bot    │
//! └──────────────┘                  └────────────┘              └──────────┘
//! ```

pub mod bot;
pub mod dispatcher;
pub mod error;
pub mod methods;
pub mod types;
pub mod update;

pub use bot::{Bot, BotExt, BotFactory, BoxedBot, downcast_bot};
pub use dispatcher::{BoxedDispatcher, Dispatcher, Signal, UpdateEnvelope};
pub use error::{ApiError, ApiResult};
pub use methods::{
    BotMethod, HttpMethod, MethodCall, SimpleQueryResult, Subscribe, Unsubscribe,
};
pub use types::{
    Callback, ChatType, LinkedMessage, Message, MessageBody, MessageLinkType, MessageStat,
    Recipient, User,
};
pub use update::{Update, UpdateType};

/// Prelude for common imports.
pub mod prelude {
    pub use super::bot::{Bot, BotExt, BotFactory, BoxedBot};
    pub use super::dispatcher::{BoxedDispatcher, Dispatcher, Signal, UpdateEnvelope};
    pub use super::error::{ApiError, ApiResult};
    pub use super::update::{Update, UpdateType};
}
