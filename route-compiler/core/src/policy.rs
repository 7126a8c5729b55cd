//! Per-destination traffic policy, as consumed by the compiler: only the
//! load-balancing portions are interpreted.

use crate::{Duration, Hostname, ProxyIdentity};
use ahash::AHashMap as HashMap;
use serde::{Deserialize, Deserializer};
use std::{collections::BTreeMap, sync::Arc};

/// Looks up the traffic policy that applies to a destination host.
pub trait PolicyStore {
    fn policy_for(
        &self,
        proxy: &ProxyIdentity,
        host: &str,
        namespace: Option<&str>,
    ) -> Option<&TrafficPolicy>;
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficPolicy {
    pub load_balancer: Option<LoadBalancerSettings>,
    #[serde(default)]
    pub port_level_settings: Vec<PortTrafficPolicy>,
    #[serde(default)]
    pub subsets: Vec<Subset>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortTrafficPolicy {
    pub port: u16,
    pub load_balancer: Option<LoadBalancerSettings>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subset {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub traffic_policy: Option<SubsetPolicy>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsetPolicy {
    pub load_balancer: Option<LoadBalancerSettings>,
    #[serde(default)]
    pub port_level_settings: Vec<PortTrafficPolicy>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadBalancerSettings {
    Simple(SimpleLb),
    ConsistentHash(ConsistentHashLb),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimpleLb {
    RoundRobin,
    LeastConn,
    Random,
    Passthrough,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistentHashLb {
    #[serde(flatten)]
    pub hash_key: HashKey,
    #[serde(default)]
    pub minimum_ring_size: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HashKey {
    HttpHeaderName(String),
    HttpCookie(HttpCookie),
    UseSourceIp(bool),
    HttpQueryParameterName(String),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct HttpCookie {
    pub name: String,
    #[serde(default)]
    pub path: String,
    pub ttl: Option<Duration>,
}

/// A traffic policy bound to a (possibly wildcarded) host, as declared in
/// some namespace.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationPolicy {
    pub host: Hostname,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub traffic_policy: TrafficPolicy,
}

/// An immutable policy-store snapshot.
#[derive(Clone, Debug, Default)]
pub struct PolicySnapshot {
    exact: Arc<HashMap<Hostname, Vec<DestinationPolicy>>>,
    wildcards: Arc<Vec<DestinationPolicy>>,
}

// === impl LoadBalancerSettings ===

impl LoadBalancerSettings {
    pub fn consistent_hash(&self) -> Option<&ConsistentHashLb> {
        match self {
            Self::ConsistentHash(ch) => Some(ch),
            Self::Simple(_) => None,
        }
    }
}

// === impl PortTrafficPolicy ===

impl PortTrafficPolicy {
    pub fn consistent_hash(&self) -> Option<&ConsistentHashLb> {
        self.load_balancer.as_ref()?.consistent_hash()
    }
}

// === impl TrafficPolicy ===

impl TrafficPolicy {
    pub fn consistent_hash(&self) -> Option<&ConsistentHashLb> {
        self.load_balancer.as_ref()?.consistent_hash()
    }

    pub fn port_settings(&self, port: u16) -> Option<&PortTrafficPolicy> {
        self.port_level_settings.iter().find(|pls| pls.port == port)
    }

    pub fn subset(&self, name: &str) -> Option<&Subset> {
        self.subsets.iter().find(|s| s.name == name)
    }
}

// === impl SubsetPolicy ===

impl SubsetPolicy {
    pub fn consistent_hash(&self) -> Option<&ConsistentHashLb> {
        self.load_balancer.as_ref()?.consistent_hash()
    }

    pub fn port_settings(&self, port: u16) -> Option<&PortTrafficPolicy> {
        self.port_level_settings.iter().find(|pls| pls.port == port)
    }
}

// === impl PolicySnapshot ===

impl PolicySnapshot {
    /// Ranks a candidate: policies in the proxy's namespace first, then the
    /// service's namespace, then anywhere else.
    fn namespace_rank(policy: &DestinationPolicy, proxy: &ProxyIdentity, namespace: Option<&str>) -> u8 {
        if policy.namespace == proxy.namespace {
            0
        } else if Some(policy.namespace.as_str()) == namespace {
            1
        } else {
            2
        }
    }
}

impl PolicyStore for PolicySnapshot {
    fn policy_for(
        &self,
        proxy: &ProxyIdentity,
        host: &str,
        namespace: Option<&str>,
    ) -> Option<&TrafficPolicy> {
        if let Some(policy) = self.exact.get(host).and_then(|candidates| {
            candidates
                .iter()
                .min_by_key(|p| Self::namespace_rank(p, proxy, namespace))
        }) {
            return Some(&policy.traffic_policy);
        }

        let host = Hostname::from(host);
        self.wildcards
            .iter()
            .filter(|p| p.host.matches(&host))
            .min_by_key(|p| {
                (
                    Self::namespace_rank(p, proxy, namespace),
                    std::cmp::Reverse(p.host.as_str().len()),
                )
            })
            .map(|p| &p.traffic_policy)
    }
}

impl std::iter::FromIterator<DestinationPolicy> for PolicySnapshot {
    fn from_iter<T: IntoIterator<Item = DestinationPolicy>>(iter: T) -> Self {
        let mut exact = HashMap::<Hostname, Vec<DestinationPolicy>>::new();
        let mut wildcards = Vec::new();
        for policy in iter {
            if policy.host.is_wildcard() {
                wildcards.push(policy);
            } else {
                exact.entry(policy.host.clone()).or_default().push(policy);
            }
        }
        Self {
            exact: Arc::new(exact),
            wildcards: Arc::new(wildcards),
        }
    }
}

impl<'de> Deserialize<'de> for PolicySnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<DestinationPolicy>::deserialize(deserializer).map(|ps| ps.into_iter().collect())
    }
}
