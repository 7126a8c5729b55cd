use super::*;
use crate::{build_routes, default_retry_policy, translate_route_match, Error, InertReason, InertRule};
use maplit::btreemap;
use route_compiler_core::{
    route::{
        HeaderMatch, HeaderValueMatch, PathMatch, QueryParamMatch, QueryValueMatch, RouteMeta,
        WeightedCluster,
    },
    rule::{Delay, FaultInjection, HeaderOperations, Headers, Redirect},
    Duration,
};
use std::collections::BTreeSet;

fn gateways() -> BTreeSet<String> {
    BTreeSet::from(["mesh".to_string()])
}

fn reviews() -> TestConfig {
    TestConfig::with_services([
        mk_service("reviews.ns.svc", [9080]),
        mk_service("ratings.ns.svc", [9080]),
        mk_service("mirror.ns.svc", [8080]),
    ])
}

fn mk_headers(set: &[(&str, &str)], remove: &[&str]) -> Headers {
    Headers {
        request: Some(HeaderOperations {
            set: set
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            add: Default::default(),
            remove: remove.iter().map(|h| h.to_string()).collect(),
        }),
        response: None,
    }
}

#[test]
fn catch_all_match_wins() {
    init_tracing();
    let test = reviews();
    let rule_set = mk_rule_set(
        "reviews",
        &["reviews.ns.svc"],
        vec![mk_rule(
            "r",
            vec![
                mk_header_match("foo", "foo", "bar"),
                mk_prefix_match("all", "/"),
            ],
            vec![mk_dst("reviews.ns.svc", 0)],
        )],
    );

    let out = build_routes(&test.ctx(), &rule_set, 9080, &gateways()).unwrap();
    assert_eq!(out.routes.len(), 1, "only the catch-all route is built");
    let route = &out.routes[0];
    assert_eq!(route.name, "r.all");
    assert!(route.catch_all);
    assert_eq!(single_cluster(route), "outbound|9080||reviews.ns.svc");
    assert_eq!(route.operation, "reviews.ns.svc:9080/*");
    assert_eq!(
        route.meta,
        RouteMeta::RuleSet {
            name: "reviews".to_string(),
            namespace: "ns".to_string(),
        }
    );
    assert!(out.inert.is_empty());
}

#[test]
fn empty_match_block_is_catch_all() {
    let test = reviews();
    let rule_set = mk_rule_set(
        "reviews",
        &["reviews.ns.svc"],
        vec![
            mk_rule(
                "r",
                vec![mk_header_match("foo", "foo", "bar"), MatchBlock::default()],
                vec![mk_dst("reviews.ns.svc", 100)],
            ),
            mk_rule("later", vec![], vec![mk_dst("ratings.ns.svc", 100)]),
        ],
    );

    let out = build_routes(&test.ctx(), &rule_set, 9080, &gateways()).unwrap();
    let routes = out
        .routes
        .iter()
        .map(|r| (r.name.as_str(), r.catch_all))
        .collect::<Vec<_>>();
    assert_eq!(routes, [("r", true)]);
    assert_eq!(
        out.inert,
        [InertRule {
            rule_set: "reviews".to_string(),
            rule: "later".to_string(),
            reason: InertReason::Unreachable,
        }]
    );
}

#[test]
fn unconditional_rule_shadows_later_rules() {
    let test = reviews();
    let rule_set = mk_rule_set(
        "reviews",
        &["reviews.ns.svc"],
        vec![
            mk_rule("first", vec![], vec![mk_dst("reviews.ns.svc", 100)]),
            mk_rule(
                "second",
                vec![mk_prefix_match("api", "/api")],
                vec![mk_dst("ratings.ns.svc", 100)],
            ),
        ],
    );

    let out = build_routes(&test.ctx(), &rule_set, 9080, &gateways()).unwrap();
    let names = out.routes.iter().map(|r| r.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["first"]);
    assert_eq!(
        out.inert,
        [InertRule {
            rule_set: "reviews".to_string(),
            rule: "second".to_string(),
            reason: InertReason::Unreachable,
        }]
    );
}

#[test]
fn filtered_catch_all_falls_through() {
    let mut test = reviews();
    test.proxy = ProxyIdentity::new("ns", Labels::from(btreemap! {
        "env".to_string() => "dev".to_string(),
    }));

    let prod_only = MatchBlock {
        source_labels: btreemap! { "env".to_string() => "prod".to_string() },
        ..mk_prefix_match("prod", "/")
    };
    let rule_set = mk_rule_set(
        "reviews",
        &["reviews.ns.svc"],
        vec![
            mk_rule(
                "r",
                vec![prod_only, mk_prefix_match("api", "/api")],
                vec![mk_dst("reviews.ns.svc", 100)],
            ),
            mk_rule("next", vec![], vec![mk_dst("ratings.ns.svc", 100)]),
        ],
    );

    let out = build_routes(&test.ctx(), &rule_set, 9080, &gateways()).unwrap();
    let names = out.routes.iter().map(|r| r.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["r.api", "next"]);
    assert!(out.inert.is_empty());
}

#[test]
fn source_labels_filter_unless_gateway_matches() {
    let mut test = reviews();
    test.proxy = ProxyIdentity::new("ns", Labels::from(btreemap! {
        "env".to_string() => "dev".to_string(),
    }));

    let prod = MatchBlock {
        source_labels: btreemap! { "env".to_string() => "prod".to_string() },
        ..mk_prefix_match("prod", "/api")
    };
    let rule_set = mk_rule_set(
        "reviews",
        &["reviews.ns.svc"],
        vec![mk_rule("r", vec![prod.clone()], vec![mk_dst("reviews.ns.svc", 100)])],
    );
    let out = build_routes(&test.ctx(), &rule_set, 9080, &gateways()).unwrap();
    assert!(out.routes.is_empty());
    assert_eq!(out.inert[0].reason, InertReason::NoRoutes);

    let via_mesh = MatchBlock {
        gateways: vec!["mesh".to_string()],
        ..prod
    };
    let rule_set = mk_rule_set(
        "reviews",
        &["reviews.ns.svc"],
        vec![mk_rule("r", vec![via_mesh], vec![mk_dst("reviews.ns.svc", 100)])],
    );
    let out = build_routes(&test.ctx(), &rule_set, 9080, &gateways()).unwrap();
    assert_eq!(out.routes.len(), 1);
}

#[test]
fn source_namespace_must_match_proxy() {
    let test = reviews();
    let other_ns = MatchBlock {
        source_namespace: "other".to_string(),
        ..mk_prefix_match("m", "/api")
    };
    let same_ns = MatchBlock {
        source_namespace: "ns".to_string(),
        ..mk_prefix_match("n", "/api")
    };
    let rule_set = mk_rule_set(
        "reviews",
        &["reviews.ns.svc"],
        vec![mk_rule(
            "r",
            vec![other_ns, same_ns],
            vec![mk_dst("reviews.ns.svc", 100)],
        )],
    );
    let out = build_routes(&test.ctx(), &rule_set, 9080, &gateways()).unwrap();
    let names = out.routes.iter().map(|r| r.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["r.n"]);
}

#[test]
fn match_port_must_equal_listen_port() {
    let test = reviews();
    let on = |name: &str, port: u16| MatchBlock {
        port: Some(port),
        ..mk_prefix_match(name, "/api")
    };
    let rule_set = mk_rule_set(
        "reviews",
        &["reviews.ns.svc"],
        vec![mk_rule(
            "r",
            vec![on("other", 9090), on("this", 9080)],
            vec![mk_dst("reviews.ns.svc", 100)],
        )],
    );
    let out = build_routes(&test.ctx(), &rule_set, 9080, &gateways()).unwrap();
    let names = out.routes.iter().map(|r| r.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["r.this"]);
}

#[test]
fn zero_weights_are_dropped() {
    let test = reviews();
    let build = |route: Vec<RouteDestination>| {
        let rule_set = mk_rule_set("reviews", &["reviews.ns.svc"], vec![mk_rule("r", vec![], route)]);
        build_routes(&test.ctx(), &rule_set, 9080, &gateways()).unwrap()
    };

    let out = build(vec![mk_dst("reviews.ns.svc", 0)]);
    assert_eq!(single_cluster(&out.routes[0]), "outbound|9080||reviews.ns.svc");

    let out = build(vec![mk_dst("reviews.ns.svc", 0), mk_dst("ratings.ns.svc", 50)]);
    assert_eq!(out.routes.len(), 1);
    assert_eq!(single_cluster(&out.routes[0]), "outbound|9080||ratings.ns.svc");

    let out = build(vec![mk_dst("reviews.ns.svc", 30), mk_dst("ratings.ns.svc", 70)]);
    match &forward(&out.routes[0]).clusters {
        ClusterSpecifier::Weighted(clusters) => {
            let weights = clusters
                .iter()
                .map(|WeightedCluster { name, weight, .. }| (name.as_str(), *weight))
                .collect::<Vec<_>>();
            assert_eq!(
                weights,
                [
                    ("outbound|9080||reviews.ns.svc", 30),
                    ("outbound|9080||ratings.ns.svc", 70)
                ]
            );
        }
        clusters => panic!("expected weighted clusters; got {clusters:?}"),
    }

    let out = build(vec![mk_dst("reviews.ns.svc", 0), mk_dst("ratings.ns.svc", 0)]);
    assert!(out.routes.is_empty());
    assert_eq!(out.inert[0].reason, InertReason::NoRoutes);
}

#[test]
fn unknown_hosts_use_the_listen_port() {
    let test = reviews();
    let rule_set = mk_rule_set(
        "ext",
        &["ext.example"],
        vec![mk_rule("r", vec![], vec![mk_dst("ext.example", 0)])],
    );
    let out = build_routes(&test.ctx(), &rule_set, 8000, &gateways()).unwrap();
    assert_eq!(single_cluster(&out.routes[0]), "outbound|8000||ext.example");
}

#[test]
fn single_destination_headers_are_promoted() {
    let test = reviews();
    let mut dst = mk_dst("reviews.ns.svc", 100);
    dst.headers = Some(mk_headers(&[("x-dst", "2")], &["x-old"]));
    let mut rule = mk_rule("r", vec![], vec![dst]);
    rule.headers = Some(mk_headers(&[("x-route", "1")], &[]));
    let rule_set = mk_rule_set("reviews", &["reviews.ns.svc"], vec![rule]);

    let out = build_routes(&test.ctx(), &rule_set, 9080, &gateways()).unwrap();
    let headers = &out.routes[0].headers;
    let keys = headers
        .request_headers_to_add
        .iter()
        .map(|h| h.key.as_str())
        .collect::<Vec<_>>();
    assert_eq!(keys, ["x-route", "x-dst"]);
    assert_eq!(headers.request_headers_to_remove, ["x-old"]);
}

#[test]
fn weighted_destinations_keep_their_headers() {
    let test = reviews();
    let mut a = mk_dst("reviews.ns.svc", 50);
    a.headers = Some(mk_headers(&[("x-a", "1")], &[]));
    let b = mk_dst("ratings.ns.svc", 50);
    let mut rule = mk_rule("r", vec![], vec![a, b]);
    rule.headers = Some(mk_headers(&[("x-route", "1")], &[]));
    let rule_set = mk_rule_set("reviews", &["reviews.ns.svc"], vec![rule]);

    let out = build_routes(&test.ctx(), &rule_set, 9080, &gateways()).unwrap();
    let route = &out.routes[0];
    assert_eq!(route.headers.request_headers_to_add.len(), 1);
    assert_eq!(route.operation, "reviews:9080/*");
    match &forward(route).clusters {
        ClusterSpecifier::Weighted(clusters) => {
            assert_eq!(clusters[0].headers.request_headers_to_add[0].key, "x-a");
            assert!(clusters[1].headers.is_empty());
        }
        clusters => panic!("expected weighted clusters; got {clusters:?}"),
    }
}

#[test]
fn forward_settings() {
    let mut test = reviews();
    test.config.default_request_timeout = Some(Duration::from_secs(15));

    let mut defaulted = mk_rule("defaulted", vec![mk_prefix_match("a", "/a")], vec![mk_dst("reviews.ns.svc", 100)]);
    defaulted.mirror = Some(Destination::new("mirror.ns.svc"));
    defaulted.fault = Some(FaultInjection {
        delay: Some(Delay {
            percent: 5,
            fixed_delay: Some(Duration::from_secs(1)),
            ..Default::default()
        }),
        abort: None,
    });

    let mut disabled = mk_rule("disabled", vec![mk_prefix_match("b", "/b")], vec![mk_dst("reviews.ns.svc", 100)]);
    disabled.timeout = Some(Duration::ZERO);

    let mut explicit = mk_rule("explicit", vec![mk_prefix_match("c", "/c")], vec![mk_dst("reviews.ns.svc", 100)]);
    explicit.timeout = Some(Duration::from_secs(2));

    let rule_set = mk_rule_set("reviews", &["reviews.ns.svc"], vec![defaulted, disabled, explicit]);
    let out = build_routes(&test.ctx(), &rule_set, 9080, &gateways()).unwrap();
    assert_eq!(out.routes.len(), 3);

    let defaulted = forward(&out.routes[0]);
    assert_eq!(defaulted.timeout, Some(Duration::from_secs(15)));
    assert_eq!(defaulted.retry_policy, Some(default_retry_policy()));
    let mirror = defaulted.mirror.as_ref().expect("mirror policy");
    assert_eq!(mirror.cluster, "outbound|8080||mirror.ns.svc");
    assert!(!mirror.trace_sampled);
    assert!(out.routes[0].fault.is_some());

    assert_eq!(forward(&out.routes[1]).timeout, None);
    assert_eq!(forward(&out.routes[2]).timeout, Some(Duration::from_secs(2)));
}

#[test]
fn unsupported_redirect_keeps_route_without_action() {
    let test = reviews();
    let mut redirect = mk_rule("moved", vec![mk_prefix_match("old", "/old")], vec![]);
    redirect.redirect = Some(Redirect {
        uri: "/new".to_string(),
        authority: String::new(),
        redirect_code: 305,
    });
    let rule_set = mk_rule_set("reviews", &["reviews.ns.svc"], vec![redirect]);

    let out = build_routes(&test.ctx(), &rule_set, 9080, &gateways()).unwrap();
    assert_eq!(out.routes.len(), 1);
    assert_eq!(out.routes[0].name, "moved.old");
    assert_eq!(out.routes[0].action, None);
    assert_eq!(out.routes[0].operation, "reviews:9080/old*");
}

#[test]
fn rules_without_actions_are_rejected() {
    let test = reviews();
    let rule_set = mk_rule_set(
        "reviews",
        &["reviews.ns.svc"],
        vec![mk_rule("broken", vec![], vec![])],
    );
    assert_eq!(
        build_routes(&test.ctx(), &rule_set, 9080, &gateways()),
        Err(Error::MissingAction {
            rule_set: "reviews".to_string(),
            rule: "broken".to_string(),
        })
    );
}

#[test]
fn translates_match_predicates() {
    let block = MatchBlock {
        uri: Some(StringMatch::Regex("^/v[0-9]+/.*".to_string())),
        ignore_uri_case: true,
        headers: [
            ("x-b".to_string(), StringMatch::Exact("1".to_string())),
            ("x-a".to_string(), StringMatch::Regex("*".to_string())),
        ]
        .into_iter()
        .collect(),
        without_headers: [("x-c".to_string(), StringMatch::Prefix("no".to_string()))]
            .into_iter()
            .collect(),
        method: Some(StringMatch::Exact("GET".to_string())),
        authority: Some(StringMatch::Prefix("api.".to_string())),
        query_params: [
            ("debug".to_string(), StringMatch::Exact("1".to_string())),
            ("page".to_string(), StringMatch::Prefix("p".to_string())),
        ]
        .into_iter()
        .collect(),
        ..Default::default()
    };

    let route_match = translate_route_match(&block);
    assert_eq!(route_match.path, PathMatch::Regex("^/v[0-9]+/.*".to_string()));
    assert!(!route_match.case_sensitive);
    assert_eq!(
        route_match.headers,
        [
            HeaderMatch {
                name: "x-a".to_string(),
                value: HeaderValueMatch::Present,
                invert: false,
            },
            HeaderMatch {
                name: "x-b".to_string(),
                value: HeaderValueMatch::Exact("1".to_string()),
                invert: false,
            },
            HeaderMatch {
                name: "x-c".to_string(),
                value: HeaderValueMatch::Prefix("no".to_string()),
                invert: true,
            },
            HeaderMatch {
                name: ":method".to_string(),
                value: HeaderValueMatch::Exact("GET".to_string()),
                invert: false,
            },
            HeaderMatch {
                name: ":authority".to_string(),
                value: HeaderValueMatch::Prefix("api.".to_string()),
                invert: false,
            },
        ]
    );
    assert_eq!(
        route_match.query_params,
        [
            QueryParamMatch {
                name: "debug".to_string(),
                value: QueryValueMatch::Exact("1".to_string()),
            },
            QueryParamMatch {
                name: "page".to_string(),
                value: QueryValueMatch::Present,
            },
        ]
    );
    assert!(!route_match.is_catch_all());
}

#[test]
fn method_only_match_is_not_catch_all() {
    let block = MatchBlock {
        method: Some(StringMatch::Exact("POST".to_string())),
        ..mk_prefix_match("post", "/")
    };
    assert!(block.is_catch_all());

    let route_match = translate_route_match(&block);
    assert!(route_match.case_sensitive);
    assert!(!route_match.is_catch_all());
}
