//! Routing strategies.
//!
//! A routing strategy owns the public URL template of a webhook endpoint. It
//! provides:
//! - the local path the route is mounted at
//! - the URL advertised to the platform for a bot ([`Routing::webhook_point`])
//! - for multi-tenant engines, the tenant key carried by a request
//!
//! | strategy | tenant key | template |
//! |---|---|---|
//! | [`StaticRouting`] | none | `https://host/webhook` |
//! | [`PathRouting`] | token | `https://host/webhook/bot/{bot_token}` |
//! | [`PathBotIdRouting`] | bot id | `https://host/webhook/{bot_id}` |

use maxo_core::Bot;
use url::Url;

use crate::adapter::BoundRequest;
use crate::error::{RoutingError, RoutingResult};

/// Default path parameter of [`PathRouting`].
pub const DEFAULT_TOKEN_PARAM: &str = "bot_token";

/// Default path parameter of [`PathBotIdRouting`].
pub const DEFAULT_BOT_ID_PARAM: &str = "bot_id";

// =============================================================================
// Traits
// =============================================================================

/// Base routing strategy.
pub trait Routing: Send + Sync + 'static {
    /// Returns the local route path, placeholders included.
    fn path(&self) -> &str;

    /// Returns the full URL template.
    fn url_template(&self) -> &str;

    /// Returns the URL the platform should push updates for `bot` to.
    fn webhook_point(&self, bot: &dyn Bot) -> RoutingResult<String>;
}

/// A strategy whose requests carry the bot token.
pub trait TokenRouting: Routing {
    /// Extracts the token from a request. Missing or empty values yield `None`.
    fn extract_token(&self, request: &BoundRequest) -> Option<String>;
}

/// A strategy whose requests carry a numeric bot id.
pub trait BotIdRouting: Routing {
    /// Extracts the bot id from a request. Missing or non-numeric values yield `None`.
    fn extract_bot_id(&self, request: &BoundRequest) -> Option<i64>;

    /// Returns the URL for a known bot id.
    fn webhook_point_for_id(&self, bot_id: i64) -> String;
}

// =============================================================================
// Template handling
// =============================================================================

/// A validated URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UrlTemplate {
    template: String,
    path: String,
}

impl UrlTemplate {
    fn parse(template: &str) -> RoutingResult<Self> {
        let url = Url::parse(template).map_err(|e| RoutingError::InvalidUrl {
            url: template.to_string(),
            reason: e.to_string(),
        })?;

        if !url.has_host() {
            return Err(RoutingError::InvalidUrl {
                url: template.to_string(),
                reason: "URL has no host".to_string(),
            });
        }

        // `Url` percent-encodes braces, so the path is cut from the raw text.
        let path = raw_path(template);

        Ok(Self {
            template: template.to_string(),
            path,
        })
    }

    fn require_placeholder(&self, param: &str) -> RoutingResult<()> {
        if self.template.contains(&placeholder(param)) {
            Ok(())
        } else {
            Err(RoutingError::MissingPlaceholder {
                param: param.to_string(),
                template: self.template.clone(),
            })
        }
    }

    fn substitute(&self, param: &str, value: &str) -> String {
        self.template.replace(&placeholder(param), value)
    }
}

fn placeholder(param: &str) -> String {
    format!("{{{param}}}")
}

fn raw_path(template: &str) -> String {
    let rest = template
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(template);

    let path = match rest.find('/') {
        Some(idx) => &rest[idx..],
        None => "/",
    };
    let end = path.find(['?', '#']).unwrap_or(path.len());

    match &path[..end] {
        "" => "/".to_string(),
        path => path.to_string(),
    }
}

// =============================================================================
// StaticRouting
// =============================================================================

/// A fixed URL shared by every request.
#[derive(Debug, Clone)]
pub struct StaticRouting {
    template: UrlTemplate,
}

impl StaticRouting {
    /// Creates a static strategy for `url`.
    pub fn new(url: &str) -> RoutingResult<Self> {
        Ok(Self {
            template: UrlTemplate::parse(url)?,
        })
    }
}

impl Routing for StaticRouting {
    fn path(&self) -> &str {
        &self.template.path
    }

    fn url_template(&self) -> &str {
        &self.template.template
    }

    fn webhook_point(&self, _bot: &dyn Bot) -> RoutingResult<String> {
        Ok(self.template.template.clone())
    }
}

// =============================================================================
// PathRouting
// =============================================================================

/// Token carried as a path parameter.
#[derive(Debug, Clone)]
pub struct PathRouting {
    template: UrlTemplate,
    param: String,
}

impl PathRouting {
    /// Creates a strategy using the `bot_token` parameter.
    pub fn new(url: &str) -> RoutingResult<Self> {
        Self::with_param(url, DEFAULT_TOKEN_PARAM)
    }

    /// Creates a strategy using a custom parameter name.
    pub fn with_param(url: &str, param: &str) -> RoutingResult<Self> {
        let template = UrlTemplate::parse(url)?;
        template.require_placeholder(param)?;
        Ok(Self {
            template,
            param: param.to_string(),
        })
    }

    /// Returns the path parameter name.
    pub fn param(&self) -> &str {
        &self.param
    }
}

impl Routing for PathRouting {
    fn path(&self) -> &str {
        &self.template.path
    }

    fn url_template(&self) -> &str {
        &self.template.template
    }

    fn webhook_point(&self, bot: &dyn Bot) -> RoutingResult<String> {
        Ok(self.template.substitute(&self.param, bot.token()))
    }
}

impl TokenRouting for PathRouting {
    fn extract_token(&self, request: &BoundRequest) -> Option<String> {
        request
            .path_param(&self.param)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    }
}

// =============================================================================
// PathBotIdRouting
// =============================================================================

/// Numeric bot id carried as a path parameter.
#[derive(Debug, Clone)]
pub struct PathBotIdRouting {
    template: UrlTemplate,
    param: String,
}

impl PathBotIdRouting {
    /// Creates a strategy using the `bot_id` parameter.
    pub fn new(url: &str) -> RoutingResult<Self> {
        Self::with_param(url, DEFAULT_BOT_ID_PARAM)
    }

    /// Creates a strategy using a custom parameter name.
    pub fn with_param(url: &str, param: &str) -> RoutingResult<Self> {
        let template = UrlTemplate::parse(url)?;
        template.require_placeholder(param)?;
        Ok(Self {
            template,
            param: param.to_string(),
        })
    }

    /// Returns the path parameter name.
    pub fn param(&self) -> &str {
        &self.param
    }
}

impl Routing for PathBotIdRouting {
    fn path(&self) -> &str {
        &self.template.path
    }

    fn url_template(&self) -> &str {
        &self.template.template
    }

    fn webhook_point(&self, bot: &dyn Bot) -> RoutingResult<String> {
        let bot_id = bot.bot_id().ok_or(RoutingError::UnknownBotId)?;
        Ok(self.webhook_point_for_id(bot_id))
    }
}

impl BotIdRouting for PathBotIdRouting {
    fn extract_bot_id(&self, request: &BoundRequest) -> Option<i64> {
        request.path_param(&self.param)?.trim().parse().ok()
    }

    fn webhook_point_for_id(&self, bot_id: i64) -> String {
        self.template.substitute(&self.param, &bot_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderMap;

    fn request_with(param: &str, value: &str) -> BoundRequest {
        BoundRequest::new(HeaderMap::new(), "").with_path_param(param, value)
    }

    #[test]
    fn test_static_path() {
        let routing = StaticRouting::new("https://example.com/webhook?x=1").unwrap();
        assert_eq!(routing.path(), "/webhook");
        assert_eq!(routing.url_template(), "https://example.com/webhook?x=1");
    }

    #[test]
    fn test_static_root_path() {
        let routing = StaticRouting::new("https://example.com").unwrap();
        assert_eq!(routing.path(), "/");
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(matches!(
            StaticRouting::new("not a url"),
            Err(RoutingError::InvalidUrl { .. })
        ));
        assert!(matches!(
            StaticRouting::new("/webhook"),
            Err(RoutingError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_path_routing_requires_placeholder() {
        let err = PathRouting::new("https://example.com/webhook").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parameter 'bot_token' not found in URL template. Expected placeholder '{bot_token}' in: https://example.com/webhook"
        );

        let err = PathRouting::with_param("https://example.com/webhook/{bot_token}", "tok").unwrap_err();
        assert!(matches!(err, RoutingError::MissingPlaceholder { ref param, .. } if param == "tok"));
    }

    #[test]
    fn test_path_routing_keeps_placeholder_in_path() {
        let routing = PathRouting::new("https://example.com/webhook/bot/{bot_token}").unwrap();
        assert_eq!(routing.path(), "/webhook/bot/{bot_token}");
    }

    #[test]
    fn test_extract_token() {
        let routing = PathRouting::new("https://example.com/webhook/{bot_token}").unwrap();
        assert_eq!(
            routing.extract_token(&request_with("bot_token", "tok1")),
            Some("tok1".to_string())
        );
        assert_eq!(routing.extract_token(&request_with("bot_token", "")), None);
        assert_eq!(routing.extract_token(&request_with("other", "tok1")), None);
    }

    #[test]
    fn test_bot_id_routing() {
        let routing = PathBotIdRouting::new("https://example.com/webhook/{bot_id}").unwrap();
        assert_eq!(routing.path(), "/webhook/{bot_id}");
        assert_eq!(
            routing.webhook_point_for_id(42),
            "https://example.com/webhook/42"
        );
        assert_eq!(routing.extract_bot_id(&request_with("bot_id", "42")), Some(42));
        assert_eq!(routing.extract_bot_id(&request_with("bot_id", "abc")), None);
        assert_eq!(routing.extract_bot_id(&request_with("other", "42")), None);
    }

    #[test]
    fn test_bot_id_routing_requires_placeholder() {
        assert!(matches!(
            PathBotIdRouting::new("https://example.com/webhook/{bot_token}"),
            Err(RoutingError::MissingPlaceholder { .. })
        ));
    }
}
