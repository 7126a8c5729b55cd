use crate::{LogFilter, LogFormat, Output, Snapshot};
use anyhow::{bail, Result};
use clap::Parser;
use route_compiler_core::{Duration, ProxyIdentity};
use route_compiler_translate::Config;
use std::{io::Write, path::PathBuf};
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[clap(
    name = "route-compiler",
    about = "Compiles HTTP routing rules into per-port proxy routes"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "route_compiler=info,warn",
        env = "ROUTE_COMPILER_LOG"
    )]
    log_level: LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: LogFormat,

    /// A YAML or JSON file holding rule sets, services and destination
    /// policies.
    #[clap(long)]
    snapshot: PathBuf,

    #[clap(long, default_value = "default")]
    proxy_namespace: String,

    /// A label on the proxy's workload, as `key=value`. May be repeated.
    #[clap(long = "proxy-label")]
    proxy_labels: Vec<Label>,

    /// A gateway name held by the proxy. Sidecars have none.
    #[clap(long = "gateway")]
    gateways: Vec<String>,

    #[clap(long, default_value = "80")]
    listen_port: u16,

    /// Applied to routes whose rules set no timeout, e.g. `15s`.
    #[clap(long, env = "ROUTE_COMPILER_DEFAULT_TIMEOUT")]
    default_timeout: Option<Duration>,

    #[clap(long, default_value = "mesh")]
    mesh_gateway: String,

    /// Stops treating ports without a declared protocol as HTTP.
    #[clap(long)]
    protocol_sniffing_disabled: bool,

    /// Emits one merged route list per port instead of per-group routes.
    #[clap(long)]
    flatten: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Label(String, String);

impl Args {
    #[inline]
    pub fn parse_and_run() -> Result<()> {
        Self::parse().run()
    }

    pub fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            snapshot,
            proxy_namespace,
            proxy_labels,
            gateways,
            listen_port,
            default_timeout,
            mesh_gateway,
            protocol_sniffing_disabled,
            flatten,
        } = self;

        log_format.try_init(log_level)?;

        let proxy = ProxyIdentity::new(
            proxy_namespace,
            proxy_labels
                .into_iter()
                .map(|Label(k, v)| (k, v))
                .collect(),
        )
        .with_gateways(gateways);
        let config = Config {
            default_request_timeout: default_timeout,
            protocol_sniffing: !protocol_sniffing_disabled,
            mesh_gateway,
        };
        debug!(?proxy, ?config, listen_port);

        let path = snapshot;
        let snapshot = Snapshot::load(&path)?;
        info!(
            path = %path.display(),
            rule_sets = snapshot.rule_sets.len(),
            services = snapshot.services.len(),
            "Loaded snapshot"
        );

        let output = Output::compile(&snapshot, &proxy, &config, listen_port, flatten)?;

        let mut stdout = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &output)?;
        writeln!(stdout)?;
        Ok(())
    }
}

impl std::str::FromStr for Label {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('=') {
            Some((k, v)) if !k.is_empty() => Ok(Self(k.to_string(), v.to_string())),
            _ => bail!("invalid label: {s:?}; expected key=value"),
        }
    }
}
