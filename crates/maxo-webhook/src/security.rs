//! Request authentication.
//!
//! [`Security`] is an ordered AND-chain of [`SecurityCheck`]s: a request is
//! authorized only if every check passes, and evaluation stops at the first
//! failure.

use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use async_trait::async_trait;
use maxo_core::Bot;
use subtle::ConstantTimeEq;

use crate::adapter::BoundRequest;
use crate::error::{SecurityError, SecurityResult};

/// Header the platform echoes the subscription secret in.
pub const SECRET_HEADER: &str = "x-max-bot-api-secret";

/// Networks the platform delivers webhooks from.
pub const DEFAULT_NETWORKS: [IpNetwork; 2] = [
    IpNetwork::v4(Ipv4Addr::new(149, 154, 160, 0), 20),
    IpNetwork::v4(Ipv4Addr::new(91, 108, 4, 0), 22),
];

// =============================================================================
// SecurityCheck
// =============================================================================

/// One authentication rule.
#[async_trait]
pub trait SecurityCheck: Send + Sync + 'static {
    /// Returns whether `request` passes this check for `bot`.
    async fn verify(&self, bot: &dyn Bot, request: &BoundRequest) -> bool;

    /// Returns the subscription secret this check expects, if it is secret-based.
    fn secret_token(&self, _bot: &dyn Bot) -> Option<String> {
        None
    }
}

/// A shared SecurityCheck trait object.
pub type BoxedSecurityCheck = Arc<dyn SecurityCheck>;

// =============================================================================
// StaticSecretToken
// =============================================================================

/// Compares the secret header against a fixed value.
#[derive(Clone)]
pub struct StaticSecretToken {
    token: String,
}

impl StaticSecretToken {
    /// Creates a check for `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Returns the expected secret.
    pub fn secret(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for StaticSecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticSecretToken")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl SecurityCheck for StaticSecretToken {
    async fn verify(&self, _bot: &dyn Bot, request: &BoundRequest) -> bool {
        match request.header(SECRET_HEADER) {
            Some(incoming) => incoming.as_bytes().ct_eq(self.token.as_bytes()).into(),
            None => false,
        }
    }

    fn secret_token(&self, _bot: &dyn Bot) -> Option<String> {
        Some(self.token.clone())
    }
}

// =============================================================================
// IP filtering
// =============================================================================

/// An IPv4 or IPv6 network in CIDR form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpNetwork {
    addr: IpAddr,
    prefix: u8,
}

impl IpNetwork {
    /// Creates an IPv4 network. Host bits are ignored.
    pub const fn v4(addr: Ipv4Addr, prefix: u8) -> Self {
        Self {
            addr: IpAddr::V4(addr),
            prefix,
        }
    }

    /// Parses `addr/prefix`. Host bits are allowed and ignored.
    pub fn parse(entry: &str) -> SecurityResult<Self> {
        let invalid = |reason: &str| SecurityError::InvalidIpEntry {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        let (addr, prefix) = entry
            .trim()
            .split_once('/')
            .ok_or_else(|| invalid("missing prefix length"))?;
        let addr: IpAddr = addr.parse().map_err(|_| invalid("invalid address"))?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid("invalid prefix length"))?;

        let max = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix > max {
            return Err(invalid("prefix length out of range"));
        }

        Ok(Self { addr, prefix })
    }

    /// Returns whether `ip` lies in this network.
    ///
    /// IPv4-mapped IPv6 addresses match as their IPv4 form.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.addr, ip.to_canonical()) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = prefix_mask_u32(self.prefix);
                u32::from(net) & mask == u32::from(ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = prefix_mask_u128(self.prefix);
                u128::from(net) & mask == u128::from(ip) & mask
            }
            _ => false,
        }
    }
}

fn prefix_mask_u32(prefix: u8) -> u32 {
    match prefix {
        0 => 0,
        p => u32::MAX << (32 - u32::from(p.min(32))),
    }
}

fn prefix_mask_u128(prefix: u8) -> u128 {
    match prefix {
        0 => 0,
        p => u128::MAX << (128 - u32::from(p.min(128))),
    }
}

impl fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

/// An allow-list of single addresses and networks.
#[derive(Debug, Clone, Default)]
pub struct IpFilter {
    addresses: HashSet<IpAddr>,
    networks: Vec<IpNetwork>,
}

impl IpFilter {
    /// Creates an empty filter that rejects everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses allow-list entries: `a.b.c.d`, `::1`, `a.b.c.d/n`, `fe80::/10`.
    pub fn parse<I, S>(entries: I) -> SecurityResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::new();
        for entry in entries {
            filter.add(entry.as_ref())?;
        }
        Ok(filter)
    }

    /// Adds one allow-list entry.
    pub fn add(&mut self, entry: &str) -> SecurityResult<()> {
        if entry.contains('/') {
            self.networks.push(IpNetwork::parse(entry)?);
        } else {
            let addr: IpAddr = entry
                .trim()
                .parse()
                .map_err(|_| SecurityError::InvalidIpEntry {
                    entry: entry.to_string(),
                    reason: "invalid address".to_string(),
                })?;
            self.addresses.insert(addr.to_canonical());
        }
        Ok(())
    }

    /// Adds a network.
    pub fn with_network(mut self, network: IpNetwork) -> Self {
        self.networks.push(network);
        self
    }

    /// Adds the platform's default delivery networks.
    pub fn with_default_networks(mut self) -> Self {
        self.networks.extend(DEFAULT_NETWORKS);
        self
    }

    /// Returns whether `ip` is allowed.
    pub fn contains(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        self.addresses.contains(&ip) || self.networks.iter().any(|net| net.contains(ip))
    }

    /// Returns whether the filter allows nothing.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty() && self.networks.is_empty()
    }
}

/// Allows requests from listed client addresses only.
///
/// The client address is the first `X-Forwarded-For` hop, else the peer.
/// Requests with no usable address are rejected.
#[derive(Debug, Clone)]
pub struct IpCheck {
    filter: IpFilter,
}

impl IpCheck {
    /// Creates a check from allow-list entries.
    ///
    /// With `include_default`, the platform's delivery networks are allowed too.
    pub fn new<I, S>(entries: I, include_default: bool) -> SecurityResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = IpFilter::parse(entries)?;
        if include_default {
            filter = filter.with_default_networks();
        }
        Ok(Self { filter })
    }

    /// Creates a check from a prepared filter.
    pub fn from_filter(filter: IpFilter) -> Self {
        Self { filter }
    }
}

#[async_trait]
impl SecurityCheck for IpCheck {
    async fn verify(&self, _bot: &dyn Bot, request: &BoundRequest) -> bool {
        request
            .client_ip()
            .is_some_and(|ip| self.filter.contains(ip))
    }
}

// =============================================================================
// Security
// =============================================================================

/// Ordered, short-circuiting AND-chain of checks.
#[derive(Clone, Default)]
pub struct Security {
    checks: Vec<BoxedSecurityCheck>,
}

impl Security {
    /// Creates a chain from `checks`, evaluated in order.
    pub fn new(checks: impl IntoIterator<Item = BoxedSecurityCheck>) -> Self {
        Self {
            checks: checks.into_iter().collect(),
        }
    }

    /// Prepends a static secret check.
    pub fn with_secret_token(mut self, token: StaticSecretToken) -> Self {
        self.checks.insert(0, Arc::new(token));
        self
    }

    /// Appends a check.
    pub fn with_check<C: SecurityCheck>(mut self, check: C) -> Self {
        self.checks.push(Arc::new(check));
        self
    }

    /// Returns the number of checks.
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Returns whether the chain has no checks.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Returns whether `request` passes every check.
    pub async fn verify(&self, bot: &dyn Bot, request: &BoundRequest) -> bool {
        for check in &self.checks {
            if !check.verify(bot, request).await {
                return false;
            }
        }
        true
    }

    /// Returns the first configured secret, if any.
    pub fn get_secret_token(&self, bot: &dyn Bot) -> Option<String> {
        self.checks.iter().find_map(|check| check.secret_token(bot))
    }
}

impl fmt::Debug for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Security")
            .field("checks", &self.checks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBot;
    use http::{HeaderMap, HeaderValue};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request_with_secret(secret: &'static str) -> BoundRequest {
        let mut headers = HeaderMap::new();
        headers.insert("X-Max-Bot-Api-Secret", HeaderValue::from_static(secret));
        BoundRequest::new(headers, "")
    }

    fn request_from(ip: &str) -> BoundRequest {
        BoundRequest::new(HeaderMap::new(), "").with_peer_ip(ip.parse().unwrap())
    }

    struct CountingCheck {
        result: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SecurityCheck for CountingCheck {
        async fn verify(&self, _bot: &dyn Bot, _request: &BoundRequest) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
        }
    }

    #[tokio::test]
    async fn test_static_secret() {
        let bot = MockBot::new("tok");
        let check = StaticSecretToken::new("s3cret");

        assert!(check.verify(&bot, &request_with_secret("s3cret")).await);
        assert!(!check.verify(&bot, &request_with_secret("S3CRET")).await);
        assert!(!check.verify(&bot, &request_with_secret("s3cre")).await);
        assert!(!check.verify(&bot, &BoundRequest::default()).await);
    }

    #[test]
    fn test_network_contains() {
        let net = IpNetwork::parse("149.154.160.5/20").unwrap();
        assert!(net.contains("149.154.175.255".parse().unwrap()));
        assert!(!net.contains("149.154.176.0".parse().unwrap()));

        let v6 = IpNetwork::parse("2001:db8::/32").unwrap();
        assert!(v6.contains("2001:db8::1".parse().unwrap()));
        assert!(!v6.contains("2001:db9::1".parse().unwrap()));
        assert!(!v6.contains("10.0.0.1".parse().unwrap()));

        let all = IpNetwork::parse("0.0.0.0/0").unwrap();
        assert!(all.contains("8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn test_ipv4_mapped_peers_match_ipv4_entries() {
        let net = IpNetwork::parse("91.108.4.0/22").unwrap();
        assert!(net.contains("::ffff:91.108.4.10".parse().unwrap()));
        assert!(!net.contains("::ffff:91.108.8.1".parse().unwrap()));

        let filter = IpFilter::parse(["10.0.0.1", "::ffff:10.0.0.2"]).unwrap();
        assert!(filter.contains("::ffff:10.0.0.1".parse().unwrap()));
        assert!(filter.contains("10.0.0.2".parse().unwrap()));
        assert!(!filter.contains("::ffff:10.0.0.3".parse().unwrap()));
    }

    #[test]
    fn test_invalid_entries() {
        assert!(IpFilter::parse(["10.0.0.1/33"]).is_err());
        assert!(IpFilter::parse(["not-an-ip"]).is_err());
        assert!(IpFilter::parse(["10.0.0.0/x"]).is_err());
        assert!(IpCheck::new(["999.0.0.1"], true).is_err());
    }

    #[tokio::test]
    async fn test_ip_check_default_networks() {
        let bot = MockBot::new("tok");
        let check = IpCheck::new(Vec::<String>::new(), true).unwrap();
        assert!(check.verify(&bot, &request_from("91.108.4.10")).await);
        assert!(check.verify(&bot, &request_from("::ffff:149.154.167.1")).await);
        assert!(!check.verify(&bot, &request_from("127.0.0.1")).await);

        let without_defaults = IpCheck::new(["127.0.0.1"], false).unwrap();
        assert!(without_defaults.verify(&bot, &request_from("127.0.0.1")).await);
        assert!(!without_defaults.verify(&bot, &request_from("91.108.4.10")).await);
    }

    #[tokio::test]
    async fn test_ip_check_without_address_fails_closed() {
        let bot = MockBot::new("tok");
        let check = IpCheck::new(["0.0.0.0/0"], false).unwrap();
        assert!(!check.verify(&bot, &BoundRequest::default()).await);
    }

    #[tokio::test]
    async fn test_chain_short_circuits() {
        let bot = MockBot::new("tok");
        let calls = Arc::new(AtomicUsize::new(0));
        let security = Security::default()
            .with_check(CountingCheck {
                result: false,
                calls: Arc::clone(&calls),
            })
            .with_check(CountingCheck {
                result: true,
                calls: Arc::clone(&calls),
            });

        assert!(!security.verify(&bot, &BoundRequest::default()).await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_secret_token_lookup() {
        let bot = MockBot::new("tok");
        let ip = IpCheck::new(["127.0.0.1"], false).unwrap();

        let security = Security::default().with_check(ip.clone());
        assert_eq!(security.get_secret_token(&bot), None);

        let security = Security::default()
            .with_check(ip)
            .with_secret_token(StaticSecretToken::new("first"))
            .with_check(StaticSecretToken::new("second"));
        assert_eq!(security.get_secret_token(&bot), Some("first".to_string()));
        assert_eq!(security.len(), 3);
    }

    #[test]
    fn test_empty_secret_is_distinct_from_none() {
        let bot = MockBot::new("tok");
        let security = Security::default().with_secret_token(StaticSecretToken::new(""));
        assert_eq!(security.get_secret_token(&bot), Some(String::new()));
    }
}
