//! Cluster identifiers name a concrete forwarding target as
//! `<direction>|<port>|<subset>|<hostname>`, e.g.
//! `outbound|8080|v1|reviews.default.svc.cluster.local`.
//!
//! Fields are not escaped. For subsets and hostnames without `|`, the
//! encoding is injective and [`ClusterKey::decode`] recovers exactly what
//! [`ClusterKey::encode`] was given; a name containing `|` encodes to an
//! identifier that no longer decodes.

use crate::Hostname;
use std::{fmt, str::FromStr};

const SEPARATOR: char = '|';

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Inbound,
    Outbound,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClusterKey {
    pub direction: Direction,
    pub subset: String,
    pub hostname: Hostname,
    pub port: u16,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("cluster name must have 4 `|`-separated fields; found {0}")]
    FieldCount(usize),

    #[error("unknown traffic direction {0:?}")]
    Direction(String),

    #[error("invalid cluster port: {0}")]
    Port(#[from] std::num::ParseIntError),
}

// === impl Direction ===

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbound" => Ok(Self::Inbound),
            "outbound" => Ok(Self::Outbound),
            s => Err(ParseError::Direction(s.to_string())),
        }
    }
}

// === impl ClusterKey ===

impl ClusterKey {
    pub fn outbound(subset: impl Into<String>, hostname: Hostname, port: u16) -> Self {
        Self {
            direction: Direction::Outbound,
            subset: subset.into(),
            hostname,
            port,
        }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parses a cluster identifier. Statically configured clusters (e.g.
    /// `BlackHoleCluster`) do not follow the naming scheme and fail to decode.
    pub fn decode(name: &str) -> Result<Self, ParseError> {
        let fields = name.split(SEPARATOR).collect::<Vec<_>>();
        let &[direction, port, subset, hostname] = fields.as_slice() else {
            return Err(ParseError::FieldCount(fields.len()));
        };
        Ok(Self {
            direction: direction.parse()?,
            port: port.parse()?,
            subset: subset.to_string(),
            hostname: Hostname::from(hostname),
        })
    }
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
            self.direction, self.port, self.subset, self.hostname
        )
    }
}

impl FromStr for ClusterKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
