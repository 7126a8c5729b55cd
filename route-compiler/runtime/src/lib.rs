#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use route_compiler_core as core;
pub use route_compiler_translate as translate;

mod args;
mod log;
mod output;
mod snapshot;

pub use self::{
    args::Args,
    log::{LogFilter, LogFormat},
    output::Output,
    snapshot::Snapshot,
};
