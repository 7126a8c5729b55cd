use crate::Snapshot;
use route_compiler_core::{
    route::{CompiledRoute, VirtualHostGroup},
    ProxyIdentity,
};
use route_compiler_translate::{build_sidecar_virtual_hosts, Config, Context, Error, InertRule};
use serde::Serialize;
use tracing::{info, warn};

/// The compiled routes for one proxy, as written to stdout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    #[serde(flatten)]
    pub routes: Routes,
    pub inert: Vec<Inert>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Routes {
    Groups(Vec<VirtualHostGroup>),

    /// Every group's routes merged per port, with catch-all routes last.
    Ports(Vec<PortRoutes>),
}

#[derive(Debug, Serialize)]
pub struct PortRoutes {
    pub port: u16,
    pub routes: Vec<CompiledRoute>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inert {
    pub rule_set: String,
    pub rule: String,
    pub reason: String,
}

// === impl Output ===

impl Output {
    pub fn compile(
        snapshot: &Snapshot,
        proxy: &ProxyIdentity,
        config: &Config,
        listen_port: u16,
        flatten: bool,
    ) -> Result<Self, Error> {
        let ctx = Context {
            proxy,
            registry: &snapshot.services,
            policies: &snapshot.policies,
            config,
        };
        let vhosts = build_sidecar_virtual_hosts(&ctx, &snapshot.rule_sets, listen_port)?;
        info!(groups = vhosts.groups.len(), "Compiled routes");

        for InertRule {
            rule_set,
            rule,
            reason,
        } in &vhosts.inert
        {
            warn!(%rule_set, %rule, %reason, "Rule has no effect");
        }
        let inert = vhosts
            .inert
            .iter()
            .map(|inert| Inert {
                rule_set: inert.rule_set.clone(),
                rule: inert.rule.clone(),
                reason: inert.reason.to_string(),
            })
            .collect();

        let routes = if flatten {
            Routes::Ports(
                vhosts
                    .ports()
                    .into_iter()
                    .map(|port| PortRoutes {
                        port,
                        routes: vhosts.port_routes(port),
                    })
                    .collect(),
            )
        } else {
            Routes::Groups(vhosts.groups)
        };

        Ok(Self { routes, inert })
    }
}
