//! User-authored routing configuration.

use crate::{Duration, Hostname};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;

/// A named list of routing rules bound to a set of hostnames.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    pub hosts: Vec<Hostname>,
    #[serde(default)]
    pub http: Vec<RoutingRule>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRule {
    #[serde(default)]
    pub name: String,

    /// An empty list matches every request.
    #[serde(default, rename = "match")]
    pub matches: Vec<MatchBlock>,

    #[serde(default)]
    pub route: Vec<RouteDestination>,
    pub redirect: Option<Redirect>,
    pub rewrite: Option<Rewrite>,
    pub timeout: Option<Duration>,
    pub retries: Option<RetrySpec>,
    pub fault: Option<FaultInjection>,
    pub mirror: Option<Destination>,
    pub mirror_percentage: Option<Percent>,

    /// Integer percentage; superseded by `mirror_percentage`.
    pub mirror_percent: Option<u32>,
    pub cors_policy: Option<CorsSpec>,
    pub headers: Option<Headers>,
}

/// What a rule does with matching requests. A redirect takes precedence over
/// any destinations.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Action<'r> {
    Redirect(&'r Redirect),
    Forward(&'r [RouteDestination]),
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchBlock {
    #[serde(default)]
    pub name: String,
    pub uri: Option<StringMatch>,
    pub scheme: Option<StringMatch>,
    pub method: Option<StringMatch>,
    pub authority: Option<StringMatch>,
    #[serde(default)]
    pub headers: IndexMap<String, StringMatch>,
    #[serde(default)]
    pub without_headers: IndexMap<String, StringMatch>,
    #[serde(default)]
    pub query_params: IndexMap<String, StringMatch>,
    #[serde(default)]
    pub ignore_uri_case: bool,

    /// Restricts the match to a single listener port.
    pub port: Option<u16>,
    #[serde(default)]
    pub source_labels: BTreeMap<String, String>,
    #[serde(default)]
    pub source_namespace: String,
    #[serde(default)]
    pub gateways: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StringMatch {
    Exact(String),
    Prefix(String),
    Regex(String),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDestination {
    pub destination: Destination,
    #[serde(default)]
    pub weight: u32,
    pub headers: Option<Headers>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub host: Hostname,
    #[serde(default)]
    pub subset: String,
    pub port: Option<PortSelector>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PortSelector {
    pub number: u16,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Headers {
    pub request: Option<HeaderOperations>,
    pub response: Option<HeaderOperations>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct HeaderOperations {
    #[serde(default)]
    pub set: IndexMap<String, String>,
    #[serde(default)]
    pub add: IndexMap<String, String>,
    #[serde(default)]
    pub remove: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub authority: String,

    /// Zero selects the default, 301.
    #[serde(default)]
    pub redirect_code: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Rewrite {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub authority: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySpec {
    pub attempts: i32,
    pub per_try_timeout: Option<Duration>,

    /// Comma-separated retry conditions and/or HTTP status codes.
    #[serde(default)]
    pub retry_on: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct FaultInjection {
    pub delay: Option<Delay>,
    pub abort: Option<Abort>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delay {
    pub percentage: Option<Percent>,
    #[serde(default)]
    pub percent: u32,
    pub fixed_delay: Option<Duration>,
    pub exponential_delay: Option<Duration>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DelayKind {
    Fixed(Duration),
    Exponential(Duration),
    Unspecified,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Abort {
    pub percentage: Option<Percent>,
    #[serde(default)]
    pub percent: u32,
    pub http_status: Option<u16>,
    pub grpc_status: Option<String>,
    pub http2_error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbortKind<'a> {
    HttpStatus(u16),
    GrpcStatus(&'a str),
    Http2Error(&'a str),
    Unspecified,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Percent {
    pub value: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsSpec {
    pub allow_origins: Option<Vec<StringMatch>>,

    /// Exact origins; superseded by `allow_origins`.
    pub allow_origin: Option<Vec<String>>,
    #[serde(default)]
    pub allow_methods: Vec<String>,
    #[serde(default)]
    pub allow_headers: Vec<String>,
    #[serde(default)]
    pub expose_headers: Vec<String>,
    pub max_age: Option<Duration>,
    pub allow_credentials: Option<bool>,
}

// === impl RoutingRule ===

impl RoutingRule {
    /// Returns `None` when the rule has neither a redirect nor destinations.
    pub fn action(&self) -> Option<Action<'_>> {
        if let Some(redirect) = self.redirect.as_ref() {
            return Some(Action::Redirect(redirect));
        }
        if self.route.is_empty() {
            return None;
        }
        Some(Action::Forward(&self.route))
    }
}

// === impl MatchBlock ===

impl MatchBlock {
    /// A match block is catch-all when it constrains neither headers nor
    /// query parameters and its URI match is `prefix: /` or `regex: *`. A
    /// missing URI match defaults to `prefix: /`.
    pub fn is_catch_all(&self) -> bool {
        let catch_all_uri = match &self.uri {
            None => true,
            Some(StringMatch::Prefix(p)) => p == "/",
            Some(StringMatch::Regex(r)) => r == "*",
            Some(StringMatch::Exact(_)) => false,
        };
        catch_all_uri && self.headers.is_empty() && self.query_params.is_empty()
    }
}

// === impl Destination ===

impl Destination {
    pub fn new(host: impl Into<Hostname>) -> Self {
        Self {
            host: host.into(),
            subset: String::new(),
            port: None,
        }
    }

    #[inline]
    pub fn port_number(&self) -> Option<u16> {
        self.port.map(|PortSelector { number }| number)
    }
}

// === impl Delay ===

impl Delay {
    pub fn kind(&self) -> DelayKind {
        match (self.fixed_delay, self.exponential_delay) {
            (Some(d), _) => DelayKind::Fixed(d),
            (None, Some(d)) => DelayKind::Exponential(d),
            (None, None) => DelayKind::Unspecified,
        }
    }
}

// === impl Abort ===

impl Abort {
    pub fn kind(&self) -> AbortKind<'_> {
        if let Some(status) = self.http_status {
            return AbortKind::HttpStatus(status);
        }
        if let Some(status) = self.grpc_status.as_deref() {
            return AbortKind::GrpcStatus(status);
        }
        if let Some(error) = self.http2_error.as_deref() {
            return AbortKind::Http2Error(error);
        }
        AbortKind::Unspecified
    }
}
