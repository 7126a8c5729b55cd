#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Compiles routing rule sets into ordered, per-port route tables.
//!
//! Compilation is a pure function of a [`Context`]: the proxy being
//! configured, read-only registry and policy snapshots, and process-wide
//! [`Config`].

mod action;
mod combine;
mod default_route;
mod fault;
mod hash;
mod hosts;
mod retry;
mod routes;
mod virtual_host;


pub use self::{
    action::destination_cluster,
    combine::combine_routes,
    default_route::{default_outbound_route, DEFAULT_ROUTE_NAME},
    hosts::{resolve_hosts, ResolvedHosts},
    retry::{convert_retry_policy, default_retry_policy},
    routes::{build_routes, translate_route_match, RuleSetRoutes},
    virtual_host::{build_sidecar_virtual_hosts, VirtualHosts},
};
use route_compiler_core::{
    policy::PolicyStore, registry::ServiceRegistry, rule::RuleSet, Duration, ProxyIdentity,
};
use std::{collections::BTreeSet, fmt};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Applied to forwarded routes whose rule sets no timeout. `None`
    /// disables the timeout.
    pub default_request_timeout: Option<Duration>,

    /// Whether ports without a declared protocol get HTTP routes.
    pub protocol_sniffing: bool,

    /// The gateway name implicitly held by every sidecar proxy.
    pub mesh_gateway: String,
}

/// The inputs shared by every step of a compilation.
#[derive(Copy, Clone)]
pub struct Context<'a> {
    pub proxy: &'a ProxyIdentity,
    pub registry: &'a dyn ServiceRegistry,
    pub policies: &'a dyn PolicyStore,
    pub config: &'a Config,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("rule {rule:?} in {rule_set} has neither a redirect nor a destination")]
    MissingAction { rule_set: String, rule: String },
}

/// A rule that contributes no routes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InertRule {
    pub rule_set: String,
    pub rule: String,
    pub reason: InertReason,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InertReason {
    /// Every match block was filtered out, or no destination survived.
    NoRoutes,

    /// An earlier rule in the same rule set matches every request.
    Unreachable,
}

// === impl Config ===

impl Default for Config {
    fn default() -> Self {
        Self {
            default_request_timeout: None,
            protocol_sniffing: true,
            mesh_gateway: "mesh".to_string(),
        }
    }
}

// === impl Context ===

impl Context<'_> {
    /// The gateway names used to filter match blocks: the proxy's own when it
    /// is a gateway, otherwise the mesh gateway.
    pub fn gateway_names(&self) -> BTreeSet<String> {
        if self.proxy.is_gateway() {
            return self.proxy.gateway_names.clone();
        }
        BTreeSet::from([self.config.mesh_gateway.clone()])
    }
}

// === impl InertRule ===

impl InertRule {
    pub(crate) fn new(rule_set: &RuleSet, rule: &str, reason: InertReason) -> Self {
        Self {
            rule_set: rule_set.name.clone(),
            rule: rule.to_string(),
            reason,
        }
    }
}

impl fmt::Display for InertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRoutes => f.write_str("no routes matched"),
            Self::Unreachable => f.write_str("shadowed by an earlier unconditional rule"),
        }
    }
}
