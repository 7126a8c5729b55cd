use crate::{hash, retry, Context};
use indexmap::IndexMap;
use route_compiler_core::{
    cluster::ClusterKey,
    registry::ServiceRecord,
    route::{
        ClusterSpecifier, CorsPolicy, ForwardAction, FractionalPercent, HeaderMutations,
        HeaderValueOption, MirrorPolicy, OriginMatch, PathMatch, RedirectAction, RedirectCode,
        RouteAction, RouteMatch, WeightedCluster,
    },
    rule::{
        CorsSpec, Destination, HeaderOperations, Headers, Percent, Redirect, Rewrite,
        RouteDestination, RoutingRule, StringMatch,
    },
    Hostname,
};
use tracing::warn;

/// Weight given to a rule's only destination when it declares none.
const SOLE_DESTINATION_WEIGHT: u32 = 100;

/// Names the outbound cluster for a destination.
///
/// The port is the destination's explicit port, else the service's port when
/// it exposes exactly one, else the listener port. Hosts that are not in the
/// registry still get a cluster name; traffic to it is blackholed downstream.
pub fn destination_cluster(
    destination: &Destination,
    service: Option<&ServiceRecord>,
    listen_port: u16,
) -> String {
    let port = match (destination.port_number(), service) {
        (Some(port), _) => port,
        (None, Some(svc)) => match svc.ports.as_slice() {
            [only] => only.number,
            _ => listen_port,
        },
        (None, None) => listen_port,
    };
    ClusterKey::outbound(destination.subset.clone(), destination.host.clone(), port).encode()
}

pub(crate) fn redirect(
    Redirect {
        uri,
        authority,
        redirect_code,
    }: &Redirect,
) -> Option<RedirectAction> {
    let response_code = match redirect_code {
        0 | 301 => RedirectCode::MovedPermanently,
        302 => RedirectCode::Found,
        303 => RedirectCode::SeeOther,
        307 => RedirectCode::TemporaryRedirect,
        308 => RedirectCode::PermanentRedirect,
        code => {
            warn!(%code, "Unsupported redirect code");
            return None;
        }
    };
    Some(RedirectAction {
        host: authority.clone(),
        path: uri.clone(),
        response_code,
    })
}

/// Builds a forward action, or `None` if every destination was dropped.
///
/// When a single destination remains, its header mutations are appended to
/// the route's.
pub(crate) fn forward(
    ctx: &Context<'_>,
    rule: &RoutingRule,
    destinations: &[RouteDestination],
    listen_port: u16,
    route_headers: &mut HeaderMutations,
) -> Option<ForwardAction> {
    let mut weighted = Vec::with_capacity(destinations.len());
    let mut hash_policy = Vec::new();
    for RouteDestination {
        destination,
        weight,
        headers,
    } in destinations
    {
        let weight = match *weight {
            0 if destinations.len() == 1 => SOLE_DESTINATION_WEIGHT,
            0 => continue,
            weight => weight,
        };

        let service = ctx.registry.lookup(destination.host.as_str());
        weighted.push(WeightedCluster {
            name: destination_cluster(destination, service, listen_port),
            weight,
            headers: header_mutations(headers.as_ref()),
        });
        hash_policy.extend(hash::destination_hash_policy(
            ctx,
            destination,
            service.map(|svc| svc.namespace.as_str()),
        ));
    }

    let clusters = match weighted.len() {
        0 => return None,
        1 => {
            let WeightedCluster { name, headers, .. } = weighted.remove(0);
            route_headers.extend(headers);
            ClusterSpecifier::Cluster(name)
        }
        _ => ClusterSpecifier::Weighted(weighted),
    };

    let mut action = ForwardAction::new(clusters);
    action.timeout = rule
        .timeout
        .or(ctx.config.default_request_timeout)
        .filter(|t| !t.is_zero());
    action.retry_policy = retry::convert_retry_policy(rule.retries.as_ref());
    action.cors = rule.cors_policy.as_ref().map(cors_policy);
    action.hash_policy = hash_policy;

    if let Some(Rewrite { uri, authority }) = &rule.rewrite {
        action.prefix_rewrite = Some(uri.clone()).filter(|u| !u.is_empty());
        action.host_rewrite = Some(authority.clone()).filter(|a| !a.is_empty());
    }

    if let Some(mirror) = &rule.mirror {
        action.mirror = mirror_fraction(rule).map(|runtime_fraction| MirrorPolicy {
            cluster: destination_cluster(
                mirror,
                ctx.registry.lookup(mirror.host.as_str()),
                listen_port,
            ),
            runtime_fraction,
            trace_sampled: false,
        });
    }

    Some(action)
}

/// An explicit zero disables mirroring; no percentage at all mirrors every
/// request.
fn mirror_fraction(rule: &RoutingRule) -> Option<FractionalPercent> {
    match (rule.mirror_percentage, rule.mirror_percent) {
        (Some(Percent { value }), _) => {
            (value > 0.0).then(|| FractionalPercent::from_percent(value))
        }
        (None, Some(percent)) => (percent > 0).then(|| FractionalPercent::hundred(percent)),
        (None, None) => Some(FractionalPercent::ALL),
    }
}

pub(crate) fn header_mutations(headers: Option<&Headers>) -> HeaderMutations {
    let Some(Headers { request, response }) = headers else {
        return HeaderMutations::default();
    };
    let request = request.as_ref();
    let response = response.as_ref();
    HeaderMutations {
        request_headers_to_add: headers_to_add(request),
        request_headers_to_remove: request.map(|ops| ops.remove.clone()).unwrap_or_default(),
        response_headers_to_add: headers_to_add(response),
        response_headers_to_remove: response.map(|ops| ops.remove.clone()).unwrap_or_default(),
    }
}

/// `set` operations replace existing values and come first; `add`
/// operations append.
fn headers_to_add(ops: Option<&HeaderOperations>) -> Vec<HeaderValueOption> {
    let Some(HeaderOperations { set, add, .. }) = ops else {
        return Vec::new();
    };
    let mut options = header_value_options(set, false);
    options.extend(header_value_options(add, true));
    options
}

fn header_value_options(headers: &IndexMap<String, String>, append: bool) -> Vec<HeaderValueOption> {
    let mut options = headers
        .iter()
        .map(|(key, value)| HeaderValueOption {
            key: key.clone(),
            value: value.clone(),
            append,
        })
        .collect::<Vec<_>>();
    // Keyless entries sort last.
    options.sort_by(|a, b| (a.key.is_empty(), &a.key).cmp(&(b.key.is_empty(), &b.key)));
    options
}

fn cors_policy(
    CorsSpec {
        allow_origins,
        allow_origin,
        allow_methods,
        allow_headers,
        expose_headers,
        max_age,
        allow_credentials,
    }: &CorsSpec,
) -> CorsPolicy {
    let allow_origins = match (allow_origins, allow_origin) {
        (Some(origins), _) => origins.iter().map(convert_origin).collect(),
        (None, Some(exact)) => exact.iter().cloned().map(OriginMatch::Exact).collect(),
        (None, None) => Vec::new(),
    };
    CorsPolicy {
        allow_origins,
        allow_methods: allow_methods.join(","),
        allow_headers: allow_headers.join(","),
        expose_headers: expose_headers.join(","),
        max_age: max_age.map(|age| age.as_secs().to_string()),
        allow_credentials: *allow_credentials,
        filter_enabled: FractionalPercent::ALL,
    }
}

fn convert_origin(origin: &StringMatch) -> OriginMatch {
    match origin {
        StringMatch::Exact(o) => OriginMatch::Exact(o.clone()),
        StringMatch::Prefix(o) => OriginMatch::Prefix(o.clone()),
        StringMatch::Regex(o) => OriginMatch::Regex(o.clone()),
    }
}

/// Describes a route for tracing as `<host>:<port><path>`.
///
/// The host and port come from the route's cluster when it forwards to a
/// single, well-formed cluster; otherwise the rule set name and listener port
/// are used.
pub(crate) fn operation(
    route_match: &RouteMatch,
    action: Option<&RouteAction>,
    rule_set: &str,
    listen_port: u16,
) -> String {
    let path = match &route_match.path {
        PathMatch::Prefix(prefix) => format!("{prefix}*"),
        PathMatch::Exact(path) => path.clone(),
        PathMatch::Regex(regex) => regex.clone(),
    };

    let cluster = match action {
        Some(RouteAction::Forward(fwd)) => fwd.clusters.single(),
        _ => None,
    };
    match cluster.map(ClusterKey::decode) {
        Some(Ok(ClusterKey { hostname, port, .. })) => format!("{hostname}:{port}{path}"),
        _ => format!("{rule_set}:{listen_port}{path}"),
    }
}

pub(crate) fn trace_operation(host: &Hostname, port: u16) -> String {
    format!("{host}:{port}/*")
}
