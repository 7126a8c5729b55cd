//! Compiled, proxy-consumable routes.

use crate::{registry::ServiceRecord, Duration, Hostname};
use serde::Serialize;

/// The routes served on one listener port for a set of hosts.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualHostGroup {
    pub port: u16,
    pub services: Vec<ServiceRecord>,
    pub extra_hostnames: Vec<Hostname>,
    pub routes: Vec<CompiledRoute>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledRoute {
    pub name: String,

    #[serde(rename = "match")]
    pub route_match: RouteMatch,

    /// Absent when the rule's action could not be expressed, e.g. an
    /// unsupported redirect code.
    pub action: Option<RouteAction>,
    pub headers: HeaderMutations,
    pub fault: Option<FaultPolicy>,

    /// The trace decorator operation.
    pub operation: String,
    pub meta: RouteMeta,
    pub catch_all: bool,
}

/// Records where a compiled route came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteMeta {
    Default(String),
    RuleSet { name: String, namespace: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMatch {
    pub path: PathMatch,
    pub case_sensitive: bool,
    pub headers: Vec<HeaderMatch>,
    pub query_params: Vec<QueryParamMatch>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PathMatch {
    Exact(String),
    Prefix(String),
    Regex(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderMatch {
    pub name: String,
    pub value: HeaderValueMatch,
    pub invert: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HeaderValueMatch {
    Present,
    Exact(String),
    Prefix(String),
    Regex(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParamMatch {
    pub name: String,
    pub value: QueryValueMatch,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryValueMatch {
    Present,
    Exact(String),
    Regex(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteAction {
    Redirect(RedirectAction),
    Forward(ForwardAction),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectAction {
    pub host: String,
    pub path: String,
    pub response_code: RedirectCode,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum RedirectCode {
    MovedPermanently,
    Found,
    SeeOther,
    TemporaryRedirect,
    PermanentRedirect,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardAction {
    pub clusters: ClusterSpecifier,

    /// `None` disables the request timeout.
    pub timeout: Option<Duration>,
    pub retry_policy: Option<RetryPolicy>,
    pub mirror: Option<MirrorPolicy>,
    pub cors: Option<CorsPolicy>,
    pub hash_policy: Vec<HashPolicy>,
    pub prefix_rewrite: Option<String>,
    pub host_rewrite: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClusterSpecifier {
    Cluster(String),
    Weighted(Vec<WeightedCluster>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedCluster {
    pub name: String,
    pub weight: u32,
    pub headers: HeaderMutations,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderMutations {
    pub request_headers_to_add: Vec<HeaderValueOption>,
    pub request_headers_to_remove: Vec<String>,
    pub response_headers_to_add: Vec<HeaderValueOption>,
    pub response_headers_to_remove: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HeaderValueOption {
    pub key: String,
    pub value: String,
    pub append: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    pub retry_on: String,
    pub num_retries: u32,
    pub per_try_timeout: Option<Duration>,
    pub retriable_status_codes: Vec<u32>,
    pub retry_host_predicates: Vec<String>,
    pub host_selection_retry_max_attempts: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorPolicy {
    pub cluster: String,
    pub runtime_fraction: FractionalPercent,
    pub trace_sampled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsPolicy {
    pub allow_origins: Vec<OriginMatch>,
    pub allow_methods: String,
    pub allow_headers: String,
    pub expose_headers: String,

    /// Seconds, formatted as a decimal string.
    pub max_age: Option<String>,
    pub allow_credentials: Option<bool>,
    pub filter_enabled: FractionalPercent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OriginMatch {
    Exact(String),
    Prefix(String),
    Regex(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HashPolicy {
    Header {
        name: String,
    },
    Cookie {
        name: String,
        ttl: Option<Duration>,
        path: String,
    },
    ConnectionProperties {
        source_ip: bool,
    },
    QueryParameter {
        name: String,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultPolicy {
    pub delay: Option<FaultDelay>,
    pub abort: Option<FaultAbort>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultDelay {
    pub percentage: FractionalPercent,
    pub fixed_delay: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultAbort {
    pub percentage: FractionalPercent,
    pub http_status: u16,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FractionalPercent {
    pub numerator: u32,
    pub denominator: Denominator,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Denominator {
    Hundred,
    Million,
}

// === impl RouteMatch ===

impl Default for RouteMatch {
    fn default() -> Self {
        Self {
            path: PathMatch::Prefix("/".to_string()),
            case_sensitive: true,
            headers: Vec::new(),
            query_params: Vec::new(),
        }
    }
}

impl RouteMatch {
    /// True when the match admits every request: a `/` prefix or `*` regex
    /// path with no header or query-parameter predicates.
    pub fn is_catch_all(&self) -> bool {
        let catch_all_path = match &self.path {
            PathMatch::Prefix(p) => p == "/",
            PathMatch::Regex(r) => r == "*",
            PathMatch::Exact(_) => false,
        };
        catch_all_path && self.headers.is_empty() && self.query_params.is_empty()
    }
}

// === impl HeaderMutations ===

impl HeaderMutations {
    pub fn is_empty(&self) -> bool {
        self.request_headers_to_add.is_empty()
            && self.request_headers_to_remove.is_empty()
            && self.response_headers_to_add.is_empty()
            && self.response_headers_to_remove.is_empty()
    }

    /// Appends another set of mutations after this one's.
    pub fn extend(&mut self, other: HeaderMutations) {
        let HeaderMutations {
            request_headers_to_add,
            request_headers_to_remove,
            response_headers_to_add,
            response_headers_to_remove,
        } = other;
        self.request_headers_to_add.extend(request_headers_to_add);
        self.request_headers_to_remove.extend(request_headers_to_remove);
        self.response_headers_to_add.extend(response_headers_to_add);
        self.response_headers_to_remove.extend(response_headers_to_remove);
    }
}

// === impl ForwardAction ===

impl ForwardAction {
    pub fn new(clusters: ClusterSpecifier) -> Self {
        Self {
            clusters,
            timeout: None,
            retry_policy: None,
            mirror: None,
            cors: None,
            hash_policy: Vec::new(),
            prefix_rewrite: None,
            host_rewrite: None,
        }
    }
}

// === impl ClusterSpecifier ===

impl ClusterSpecifier {
    /// Returns the cluster name when the route forwards to exactly one cluster.
    pub fn single(&self) -> Option<&str> {
        match self {
            Self::Cluster(name) => Some(name),
            Self::Weighted(_) => None,
        }
    }
}

// === impl FractionalPercent ===

impl FractionalPercent {
    pub const ALL: Self = Self::hundred(100);

    pub const fn hundred(numerator: u32) -> Self {
        Self {
            numerator,
            denominator: Denominator::Hundred,
        }
    }

    pub const fn million(numerator: u32) -> Self {
        Self {
            numerator,
            denominator: Denominator::Million,
        }
    }

    /// Expresses a fractional percentage in parts per million.
    pub fn from_percent(percent: f64) -> Self {
        Self::million((percent * 10_000.0) as u32)
    }
}
