//! Outbound method descriptors.
//!
//! A [`MethodCall`] is the transport-neutral description of one Bot API
//! request. Typed methods implement [`BotMethod`] and are sent through
//! [`BotExt::call`](crate::bot::BotExt::call).

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiResult;
use crate::update::UpdateType;

/// HTTP verb of a Bot API method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Returns the verb as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw Bot API request.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// HTTP verb.
    pub http_method: HttpMethod,
    /// Path relative to the API base URL, e.g. `/subscriptions`.
    pub path: String,
    /// Query string parameters.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl MethodCall {
    /// Creates a call without query parameters or body.
    pub fn new(http_method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            http_method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Adds a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets the JSON body.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A typed Bot API method.
pub trait BotMethod: Send {
    /// Decoded response type.
    type Response: DeserializeOwned + Send;

    /// Converts the method into its raw request.
    fn into_call(self) -> ApiResult<MethodCall>;
}

/// Generic `{success, message}` response returned by mutating methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleQueryResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// =============================================================================
// Subscriptions
// =============================================================================

/// `POST /subscriptions`: subscribes the bot to webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscribe {
    /// Public HTTPS URL the platform will push updates to.
    pub url: String,
    /// Secret echoed back in the `X-Max-Bot-Api-Secret` header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Update types to deliver.
    pub update_types: Vec<UpdateType>,
}

impl BotMethod for Subscribe {
    type Response = SimpleQueryResult;

    fn into_call(self) -> ApiResult<MethodCall> {
        let body = serde_json::to_value(&self)?;
        Ok(MethodCall::new(HttpMethod::Post, "/subscriptions").body(body))
    }
}

/// `DELETE /subscriptions`: removes the webhook subscription for `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsubscribe {
    pub url: String,
}

impl BotMethod for Unsubscribe {
    type Response = SimpleQueryResult;

    fn into_call(self) -> ApiResult<MethodCall> {
        Ok(MethodCall::new(HttpMethod::Delete, "/subscriptions").query("url", self.url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscribe_omits_missing_secret() {
        let call = Subscribe {
            url: "https://example.com/webhook".into(),
            secret: None,
            update_types: vec![UpdateType::MessageCreated],
        }
        .into_call()
        .unwrap();

        assert_eq!(call.http_method, HttpMethod::Post);
        assert_eq!(call.path, "/subscriptions");
        assert_eq!(
            call.body,
            Some(json!({
                "url": "https://example.com/webhook",
                "update_types": ["message_created"],
            }))
        );
    }

    #[test]
    fn test_subscribe_includes_secret() {
        let call = Subscribe {
            url: "https://example.com/webhook".into(),
            secret: Some("s3cret".into()),
            update_types: vec![],
        }
        .into_call()
        .unwrap();

        assert_eq!(call.body.unwrap()["secret"], "s3cret");
    }

    #[test]
    fn test_unsubscribe_uses_query() {
        let call = Unsubscribe {
            url: "https://example.com/webhook".into(),
        }
        .into_call()
        .unwrap();

        assert_eq!(call.http_method, HttpMethod::Delete);
        assert_eq!(
            call.query,
            vec![("url".to_string(), "https://example.com/webhook".to_string())]
        );
        assert!(call.body.is_none());
    }
}
