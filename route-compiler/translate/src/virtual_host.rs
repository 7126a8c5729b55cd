use crate::{
    combine_routes, default_outbound_route, resolve_hosts, routes::build_routes, Context, Error,
    InertRule, ResolvedHosts, RuleSetRoutes,
};
use route_compiler_core::{
    registry::ServiceRecord,
    route::{CompiledRoute, VirtualHostGroup},
    rule::RuleSet,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Rule sets whose hosts expose no HTTP port are grouped under this port.
const FALLBACK_HTTP_PORT: u16 = 80;

/// The output of compiling a sidecar's rule sets.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VirtualHosts {
    pub groups: Vec<VirtualHostGroup>,
    pub inert: Vec<InertRule>,
}

/// Compiles rule sets into virtual host groups for a sidecar listening on
/// `listen_port`.
///
/// Each rule set yields one group per HTTP port of the services it resolves
/// to, all sharing the rule set's routes. Every registered service not
/// covered by a group then gets a default route per HTTP port.
pub fn build_sidecar_virtual_hosts(
    ctx: &Context<'_>,
    rule_sets: &[RuleSet],
    listen_port: u16,
) -> Result<VirtualHosts, Error> {
    let gateways = ctx.gateway_names();
    let mut out = VirtualHosts::default();

    for rule_set in rule_sets {
        let groups = rule_set_groups(ctx, rule_set, listen_port, &gateways, &mut out.inert)?;
        out.groups.extend(groups);
    }

    let covered = out
        .groups
        .iter()
        .flat_map(|group| group.services.iter().map(|svc| svc.hostname.clone()))
        .collect::<BTreeSet<_>>();
    for svc in ctx.registry.services() {
        if covered.contains(&svc.hostname) {
            continue;
        }
        for port in svc
            .ports
            .iter()
            .filter(|p| p.is_http_eligible(ctx.config.protocol_sniffing))
        {
            out.groups.push(VirtualHostGroup {
                port: port.number,
                services: vec![svc.clone()],
                extra_hostnames: Vec::new(),
                routes: vec![default_outbound_route(ctx, svc, port.number)],
            });
        }
    }

    Ok(out)
}

fn rule_set_groups(
    ctx: &Context<'_>,
    rule_set: &RuleSet,
    listen_port: u16,
    gateways: &BTreeSet<String>,
    inert: &mut Vec<InertRule>,
) -> Result<Vec<VirtualHostGroup>, Error> {
    let ResolvedHosts {
        hostnames,
        services,
    } = resolve_hosts(&rule_set.hosts, ctx.registry);

    // Group services by port so that destinations without an explicit port
    // can be resolved against the port on which the service was reached.
    let mut by_port = BTreeMap::<u16, Vec<ServiceRecord>>::new();
    for svc in services {
        for port in svc
            .ports
            .iter()
            .filter(|p| p.is_http_eligible(ctx.config.protocol_sniffing))
        {
            by_port.entry(port.number).or_default().push(svc.clone());
        }
    }
    if by_port.is_empty() {
        by_port.insert(FALLBACK_HTTP_PORT, Vec::new());
    }

    let RuleSetRoutes {
        routes,
        inert: inert_rules,
    } = build_routes(ctx, rule_set, listen_port, gateways)?;
    inert.extend(inert_rules);
    if routes.is_empty() {
        debug!(rule_set = %rule_set.name, "No routes matched; discarding rule set");
        return Ok(Vec::new());
    }

    Ok(by_port
        .into_iter()
        .map(|(port, services)| VirtualHostGroup {
            port,
            services,
            extra_hostnames: hostnames.clone(),
            routes: routes.clone(),
        })
        .collect())
}

// === impl VirtualHosts ===

impl VirtualHosts {
    /// Merges the routes of every group on `port` into one ordered list, with
    /// catch-all routes last.
    pub fn port_routes(&self, port: u16) -> Vec<CompiledRoute> {
        combine_routes(
            self.groups
                .iter()
                .filter(|group| group.port == port)
                .map(|group| group.routes.iter().cloned()),
        )
    }

    /// The distinct ports for which groups were built, in ascending order.
    pub fn ports(&self) -> BTreeSet<u16> {
        self.groups.iter().map(|group| group.port).collect()
    }
}
