use crate::{action, fault, Context, Error, InertReason, InertRule};
use route_compiler_core::{
    route::{
        CompiledRoute, HeaderMatch, HeaderValueMatch, PathMatch, QueryParamMatch,
        QueryValueMatch, RouteAction, RouteMatch, RouteMeta,
    },
    rule::{Action, MatchBlock, RoutingRule, RuleSet, StringMatch},
    ProxyIdentity,
};
use std::collections::BTreeSet;
use tracing::{debug, trace, warn};

const HEADER_METHOD: &str = ":method";
const HEADER_AUTHORITY: &str = ":authority";
const HEADER_SCHEME: &str = ":scheme";

/// The routes compiled from a single rule set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleSetRoutes {
    pub routes: Vec<CompiledRoute>,
    pub inert: Vec<InertRule>,
}

/// Compiles a rule set's rules, in order, for the given listener port.
///
/// A rule without match blocks matches everything, so once it is compiled no
/// later rule is considered. Likewise, a rule with a catch-all match block
/// that survives source filtering emits only that block's route and ends the
/// rule set. Rules that contribute nothing are reported as [`InertRule`]s.
pub fn build_routes(
    ctx: &Context<'_>,
    rule_set: &RuleSet,
    listen_port: u16,
    gateways: &BTreeSet<String>,
) -> Result<RuleSetRoutes, Error> {
    let mut out = RuleSetRoutes::default();

    let mut rules = rule_set.http.iter();
    for rule in rules.by_ref() {
        let action = rule.action().ok_or_else(|| Error::MissingAction {
            rule_set: rule_set.name.clone(),
            rule: rule.name.clone(),
        })?;
        let rt = RuleTranslator {
            ctx,
            rule_set,
            rule,
            action,
            listen_port,
            gateways,
        };

        let compiled = out.routes.len();
        let exhausted = if rule.matches.is_empty() {
            out.routes.extend(rt.translate(None));
            true
        } else if let Some(route) = rule
            .matches
            .iter()
            .find(|m| m.is_catch_all())
            .and_then(|m| rt.translate(Some(m)))
        {
            out.routes.push(route);
            true
        } else {
            out.routes
                .extend(rule.matches.iter().filter_map(|m| rt.translate(Some(m))));
            false
        };

        if out.routes.len() == compiled {
            debug!(rule_set = %rule_set.name, rule = %rule.name, "Rule produced no routes");
            out.inert
                .push(InertRule::new(rule_set, &rule.name, InertReason::NoRoutes));
        }
        if exhausted {
            break;
        }
    }

    out.inert.extend(
        rules.map(|rule| InertRule::new(rule_set, &rule.name, InertReason::Unreachable)),
    );
    Ok(out)
}

struct RuleTranslator<'a> {
    ctx: &'a Context<'a>,
    rule_set: &'a RuleSet,
    rule: &'a RoutingRule,
    action: Action<'a>,
    listen_port: u16,
    gateways: &'a BTreeSet<String>,
}

// === impl RuleTranslator ===

impl RuleTranslator<'_> {
    /// Compiles the rule for one of its match blocks, or for every request
    /// when `route_match` is `None`.
    fn translate(&self, route_match: Option<&MatchBlock>) -> Option<CompiledRoute> {
        let Self {
            ctx,
            rule_set,
            rule,
            action: rule_action,
            listen_port,
            gateways,
        } = *self;

        if let Some(m) = route_match {
            if !source_matches(m, ctx.proxy, gateways) {
                trace!(rule = %rule.name, match_name = %m.name, "Source does not match");
                return None;
            }
            if let Some(port) = m.port.filter(|p| *p != 0 && *p != listen_port) {
                trace!(rule = %rule.name, match_name = %m.name, port, "Port does not match");
                return None;
            }
        }

        let name = match route_match {
            Some(m) if !m.name.is_empty() => format!("{}.{}", rule.name, m.name),
            _ => rule.name.clone(),
        };

        let mut headers = action::header_mutations(rule.headers.as_ref());
        let action = match rule_action {
            Action::Redirect(redirect) => action::redirect(redirect).map(RouteAction::Redirect),
            Action::Forward(destinations) => {
                let Some(forward) =
                    action::forward(ctx, rule, destinations, listen_port, &mut headers)
                else {
                    warn!(rule_set = %rule_set.name, rule = %rule.name, "No destination has a non-zero weight");
                    return None;
                };
                Some(RouteAction::Forward(forward))
            }
        };

        let route_match = route_match.map(translate_route_match).unwrap_or_default();
        let operation =
            action::operation(&route_match, action.as_ref(), &rule_set.name, listen_port);
        Some(CompiledRoute {
            name,
            catch_all: route_match.is_catch_all(),
            route_match,
            action,
            headers,
            fault: rule.fault.as_ref().and_then(fault::translate_fault),
            operation,
            meta: RouteMeta::RuleSet {
                name: rule_set.name.clone(),
                namespace: rule_set.namespace.clone(),
            },
        })
    }
}

/// A match block's gateway list, when set, takes precedence over its source
/// labels and namespace.
fn source_matches(m: &MatchBlock, proxy: &ProxyIdentity, gateways: &BTreeSet<String>) -> bool {
    if !m.gateways.is_empty() {
        return m.gateways.iter().any(|gw| gateways.contains(gw));
    }
    proxy.labels.is_superset_of(&m.source_labels)
        && (m.source_namespace.is_empty() || m.source_namespace == proxy.namespace)
}

/// Translates a match block into a route predicate.
///
/// Header predicates, including inverted ones, are ordered by name and
/// followed by the `:method`, `:authority` and `:scheme` pseudo-headers.
pub fn translate_route_match(
    MatchBlock {
        uri,
        scheme,
        method,
        authority,
        headers,
        without_headers,
        query_params,
        ignore_uri_case,
        ..
    }: &MatchBlock,
) -> RouteMatch {
    let mut header_matches = headers
        .iter()
        .map(|(name, value)| convert_header_match(name, value, false))
        .chain(
            without_headers
                .iter()
                .map(|(name, value)| convert_header_match(name, value, true)),
        )
        .collect::<Vec<_>>();
    header_matches.sort_by(|a, b| a.name.cmp(&b.name));

    header_matches.extend(
        [
            (HEADER_METHOD, method),
            (HEADER_AUTHORITY, authority),
            (HEADER_SCHEME, scheme),
        ]
        .into_iter()
        .filter_map(|(name, value)| Some(convert_header_match(name, value.as_ref()?, false))),
    );

    let path = match uri {
        Some(StringMatch::Exact(path)) => PathMatch::Exact(path.clone()),
        Some(StringMatch::Prefix(prefix)) => PathMatch::Prefix(prefix.clone()),
        Some(StringMatch::Regex(regex)) => PathMatch::Regex(regex.clone()),
        None => PathMatch::Prefix("/".to_string()),
    };

    let query_params = query_params
        .iter()
        .map(|(name, value)| convert_query_param_match(name, value))
        .collect();

    RouteMatch {
        path,
        case_sensitive: !*ignore_uri_case,
        headers: header_matches,
        query_params,
    }
}

/// A `*` regex matches any value, so it only requires the header be present.
fn convert_header_match(name: &str, value: &StringMatch, invert: bool) -> HeaderMatch {
    let value = match value {
        StringMatch::Regex(re) if re == "*" => HeaderValueMatch::Present,
        StringMatch::Exact(v) => HeaderValueMatch::Exact(v.clone()),
        StringMatch::Prefix(p) => HeaderValueMatch::Prefix(p.clone()),
        StringMatch::Regex(re) => HeaderValueMatch::Regex(re.clone()),
    };
    HeaderMatch {
        name: name.to_string(),
        value,
        invert,
    }
}

fn convert_query_param_match(name: &str, value: &StringMatch) -> QueryParamMatch {
    let value = match value {
        StringMatch::Exact(v) => QueryValueMatch::Exact(v.clone()),
        StringMatch::Regex(re) => QueryValueMatch::Regex(re.clone()),
        StringMatch::Prefix(_) => {
            warn!(param = %name, "Prefix query parameter matches are not supported; matching presence");
            QueryValueMatch::Present
        }
    };
    QueryParamMatch {
        name: name.to_string(),
        value,
    }
}
