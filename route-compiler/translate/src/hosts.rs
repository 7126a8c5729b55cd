use route_compiler_core::{
    registry::{ServiceRecord, ServiceRegistry},
    Hostname,
};

/// A rule set's hosts, split into registry services and free-standing names.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedHosts<'r> {
    pub hostnames: Vec<Hostname>,
    pub services: Vec<&'r ServiceRecord>,
}

/// Resolves hosts against the registry.
///
/// Exact names are looked up directly. Wildcards are matched against every
/// registered service and are kept as free-standing names only when nothing
/// in the registry matches them.
pub fn resolve_hosts<'r>(hosts: &[Hostname], registry: &'r dyn ServiceRegistry) -> ResolvedHosts<'r> {
    let mut resolved = ResolvedHosts::default();

    let (wildcards, exact): (Vec<_>, Vec<_>) = hosts.iter().partition(|h| h.is_wildcard());
    for host in exact {
        match registry.lookup(host.as_str()) {
            Some(svc) => resolved.push_service(svc),
            None => resolved.hostnames.push(host.clone()),
        }
    }

    for host in wildcards {
        let mut found = false;
        for svc in registry.services().filter(|svc| svc.hostname.matches(host)) {
            resolved.push_service(svc);
            found = true;
        }
        if !found {
            resolved.hostnames.push(host.clone());
        }
    }

    resolved
}

// === impl ResolvedHosts ===

impl<'r> ResolvedHosts<'r> {
    fn push_service(&mut self, svc: &'r ServiceRecord) {
        if !self.services.iter().any(|s| s.hostname == svc.hostname) {
            self.services.push(svc);
        }
    }
}
