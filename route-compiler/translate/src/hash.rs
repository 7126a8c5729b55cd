use crate::Context;
use route_compiler_core::{
    policy::{ConsistentHashLb, HashKey, HttpCookie, PortTrafficPolicy, SubsetPolicy},
    registry::ServiceRecord,
    route::HashPolicy,
    rule::Destination,
};

/// Resolves the hash policy for a routed destination.
///
/// Consistent-hash settings are taken from, in order: the subset's port-level
/// settings, the subset, the host's port-level settings, and the host. Port
/// levels only apply when the destination names a port.
pub(crate) fn destination_hash_policy(
    ctx: &Context<'_>,
    destination: &Destination,
    namespace: Option<&str>,
) -> Option<HashPolicy> {
    let policy = ctx
        .policies
        .policy_for(ctx.proxy, destination.host.as_str(), namespace)?;
    let port = destination.port_number();

    let subset = policy
        .subset(&destination.subset)
        .and_then(|s| s.traffic_policy.as_ref());
    let consistent_hash = subset
        .and_then(|s| port_consistent_hash(&s.port_level_settings, port))
        .or_else(|| subset.and_then(SubsetPolicy::consistent_hash))
        .or_else(|| port_consistent_hash(&policy.port_level_settings, port))
        .or_else(|| policy.consistent_hash())?;
    Some(convert_hash_policy(consistent_hash))
}

/// Resolves the hash policy for a service's default route.
///
/// A port-level setting for the port replaces the host-level load balancer
/// entirely, even when it configures no consistent hash.
pub(crate) fn service_hash_policy(
    ctx: &Context<'_>,
    svc: &ServiceRecord,
    port: u16,
) -> Option<HashPolicy> {
    let policy = ctx
        .policies
        .policy_for(ctx.proxy, svc.hostname.as_str(), Some(svc.namespace.as_str()))?;
    let consistent_hash = match policy.port_settings(port) {
        Some(settings) => settings.consistent_hash(),
        None => policy.consistent_hash(),
    }?;
    Some(convert_hash_policy(consistent_hash))
}

fn port_consistent_hash(
    settings: &[PortTrafficPolicy],
    port: Option<u16>,
) -> Option<&ConsistentHashLb> {
    let port = port?;
    settings
        .iter()
        .find(|s| s.port == port)
        .and_then(PortTrafficPolicy::consistent_hash)
}

fn convert_hash_policy(ConsistentHashLb { hash_key, .. }: &ConsistentHashLb) -> HashPolicy {
    match hash_key {
        HashKey::HttpHeaderName(name) => HashPolicy::Header { name: name.clone() },
        HashKey::HttpCookie(HttpCookie { name, path, ttl }) => HashPolicy::Cookie {
            name: name.clone(),
            ttl: *ttl,
            path: path.clone(),
        },
        HashKey::UseSourceIp(source_ip) => HashPolicy::ConnectionProperties {
            source_ip: *source_ip,
        },
        HashKey::HttpQueryParameterName(name) => HashPolicy::QueryParameter { name: name.clone() },
    }
}
