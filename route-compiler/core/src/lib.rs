#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod cluster;
mod duration;
mod hostname;
mod labels;
pub mod policy;
mod proxy;
pub mod registry;
pub mod route;
pub mod rule;

pub use self::{
    duration::{Duration, ParseError as DurationParseError},
    hostname::Hostname,
    labels::Labels,
    proxy::ProxyIdentity,
};
