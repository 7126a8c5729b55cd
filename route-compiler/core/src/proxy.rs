use crate::Labels;
use serde::Deserialize;
use std::collections::BTreeSet;

/// The identity of the proxy for which routes are compiled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyIdentity {
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub namespace: String,

    /// Set when the proxy acts as a gateway; sidecars leave this empty.
    #[serde(default)]
    pub gateway_names: BTreeSet<String>,
}

impl ProxyIdentity {
    pub fn new(namespace: impl Into<String>, labels: Labels) -> Self {
        Self {
            labels,
            namespace: namespace.into(),
            gateway_names: BTreeSet::new(),
        }
    }

    pub fn with_gateways<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gateway_names.extend(names.into_iter().map(Into::into));
        self
    }

    #[inline]
    pub fn is_gateway(&self) -> bool {
        !self.gateway_names.is_empty()
    }
}
