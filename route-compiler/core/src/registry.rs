use crate::Hostname;
use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::BTreeMap, sync::Arc};

/// Read access to the set of services known to the mesh.
pub trait ServiceRegistry {
    fn lookup(&self, hostname: &str) -> Option<&ServiceRecord>;

    /// Iterates over all services, ordered by hostname.
    fn services(&self) -> Box<dyn Iterator<Item = &ServiceRecord> + '_>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub hostname: Hostname,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    #[serde(default)]
    pub name: String,
    pub number: u16,
    #[serde(default)]
    pub protocol: Protocol,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "HTTP")]
    Http,
    #[serde(rename = "HTTP2")]
    Http2,
    #[serde(rename = "GRPC")]
    Grpc,
    #[serde(rename = "GRPC-Web")]
    GrpcWeb,
    #[serde(rename = "HTTPS")]
    Https,
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "TLS")]
    Tls,
    #[serde(rename = "UDP")]
    Udp,
    /// The protocol was not declared and must be detected on the wire.
    #[default]
    #[serde(other)]
    Unsupported,
}

/// An immutable registry snapshot, shared between compilations and replaced
/// wholesale on update.
#[derive(Clone, Debug, Default)]
pub struct RegistrySnapshot(Arc<BTreeMap<Hostname, ServiceRecord>>);

// === impl Protocol ===

impl Protocol {
    #[inline]
    pub fn is_http(&self) -> bool {
        matches!(self, Self::Http | Self::Http2 | Self::Grpc | Self::GrpcWeb)
    }
}

// === impl Port ===

impl Port {
    pub fn new(name: impl Into<String>, number: u16, protocol: Protocol) -> Self {
        Self {
            name: name.into(),
            number,
            protocol,
        }
    }

    /// Ports without a declared protocol may carry HTTP, detected by sniffing.
    #[inline]
    pub fn is_sniffable(&self) -> bool {
        self.protocol == Protocol::Unsupported
    }

    /// Whether HTTP routes are generated for this port.
    #[inline]
    pub fn is_http_eligible(&self, protocol_sniffing: bool) -> bool {
        self.protocol.is_http() || (protocol_sniffing && self.is_sniffable())
    }
}

// === impl ServiceRecord ===

impl ServiceRecord {
    pub fn new(hostname: impl Into<Hostname>, namespace: impl Into<String>, ports: Vec<Port>) -> Self {
        Self {
            hostname: hostname.into(),
            namespace: namespace.into(),
            ports,
            attributes: BTreeMap::new(),
        }
    }
}

// === impl RegistrySnapshot ===

impl RegistrySnapshot {
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ServiceRegistry for RegistrySnapshot {
    fn lookup(&self, hostname: &str) -> Option<&ServiceRecord> {
        self.0.get(hostname)
    }

    fn services(&self) -> Box<dyn Iterator<Item = &ServiceRecord> + '_> {
        Box::new(self.0.values())
    }
}

impl std::iter::FromIterator<ServiceRecord> for RegistrySnapshot {
    fn from_iter<T: IntoIterator<Item = ServiceRecord>>(iter: T) -> Self {
        Self(Arc::new(
            iter.into_iter()
                .map(|svc| (svc.hostname.clone(), svc))
                .collect(),
        ))
    }
}

impl<'de> Deserialize<'de> for RegistrySnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<ServiceRecord>::deserialize(deserializer).map(|svcs| svcs.into_iter().collect())
    }
}
