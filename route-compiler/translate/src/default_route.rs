use crate::{action, hash, retry, Context};
use route_compiler_core::{
    cluster::ClusterKey,
    registry::ServiceRecord,
    route::{
        ClusterSpecifier, CompiledRoute, ForwardAction, HeaderMutations, RouteAction, RouteMatch,
        RouteMeta,
    },
};

pub const DEFAULT_ROUTE_NAME: &str = "default";

/// Synthesizes the route for a service port that no rule set covers: forward
/// everything to the service, with no timeout and the default retry policy.
pub fn default_outbound_route(ctx: &Context<'_>, svc: &ServiceRecord, port: u16) -> CompiledRoute {
    let cluster = ClusterKey::outbound("", svc.hostname.clone(), port).encode();
    let mut forward = ForwardAction::new(ClusterSpecifier::Cluster(cluster));
    forward.retry_policy = Some(retry::default_retry_policy());
    forward.hash_policy.extend(hash::service_hash_policy(ctx, svc, port));

    let route_match = RouteMatch::default();
    CompiledRoute {
        name: DEFAULT_ROUTE_NAME.to_string(),
        catch_all: route_match.is_catch_all(),
        route_match,
        action: Some(RouteAction::Forward(forward)),
        headers: HeaderMutations::default(),
        fault: None,
        operation: action::trace_operation(&svc.hostname, port),
        meta: RouteMeta::Default(DEFAULT_ROUTE_NAME.to_string()),
    }
}
