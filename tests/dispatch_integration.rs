// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end dispatch scenarios: several independently declared chains,
//! one dispatcher, and the guarantee that exactly one chain answers.

use std::sync::Arc;

use http::StatusCode;

use warden::{
    ChainDispatcher, ChainRegistration, DenyAllStage, DispatchOutcome, DispatchRequest,
    HttpMethod, MatcherSet, PathPattern, PermitAllStage, RoutePattern, RoutePatternConfig,
    StaticRouteTable, SyntacticPattern, SyntacticPatternConfig,
};

fn get(path: &str) -> DispatchRequest {
    DispatchRequest::new(HttpMethod::Get, path)
}

fn deny() -> Vec<Arc<dyn warden::ChainStage>> {
    vec![Arc::new(DenyAllStage::default())]
}

fn permit() -> Vec<Arc<dyn warden::ChainStage>> {
    vec![Arc::new(PermitAllStage)]
}

async fn status_of(dispatcher: &ChainDispatcher, request: DispatchRequest) -> Option<StatusCode> {
    dispatcher
        .dispatch(request)
        .await
        .expect("dispatch must not error")
        .response()
        .map(|r| r.status)
}

/// A chain guarded by a route-table matcher covers the plain path, the
/// suffixed path, and the trailing-slash path alike.
#[tokio::test]
async fn route_table_matcher_secures_all_path_renderings() {
    let table = Arc::new(StaticRouteTable::new());
    table.register("/path");

    let matcher = MatcherSet::from(PathPattern::RouteTable(RoutePattern::new(
        RoutePatternConfig::new("/path"),
        table,
    )));

    let dispatcher =
        ChainDispatcher::build(vec![ChainRegistration::new("app", 0, matcher, deny())]);

    for path in ["/path", "/path.html", "/path/"] {
        assert_eq!(
            status_of(&dispatcher, get(path)).await,
            Some(StatusCode::UNAUTHORIZED),
            "route-table chain must claim '{path}'"
        );
    }
}

/// A syntactic matcher without the legacy flags secures only the literal
/// path; suffixed and trailing-slash renderings pass through.
#[tokio::test]
async fn syntactic_matcher_secures_only_the_literal_path() {
    let matcher = MatcherSet::from(PathPattern::Syntactic(
        SyntacticPattern::literal("/path").unwrap(),
    ));

    let dispatcher =
        ChainDispatcher::build(vec![ChainRegistration::new("app", 0, matcher, deny())]);

    assert_eq!(
        status_of(&dispatcher, get("/path")).await,
        Some(StatusCode::UNAUTHORIZED)
    );

    for path in ["/path.html", "/path/"] {
        let outcome = dispatcher.dispatch(get(path)).await.unwrap();
        assert!(
            outcome.is_unmatched(),
            "syntactic chain must not claim '{path}'"
        );
    }
}

/// With the legacy flags enabled, the syntactic matcher behaves like the
/// route-table one for suffix and trailing-slash renderings.
#[tokio::test]
async fn syntactic_matcher_with_legacy_flags_widens_coverage() {
    let mut config = SyntacticPatternConfig::new("/path");
    config.match_trailing_slash = true;
    config.match_file_extension_suffix = true;
    let matcher = MatcherSet::from(PathPattern::Syntactic(
        SyntacticPattern::new(config).unwrap(),
    ));

    let dispatcher =
        ChainDispatcher::build(vec![ChainRegistration::new("app", 0, matcher, deny())]);

    for path in ["/path", "/path.html", "/path/"] {
        assert_eq!(
            status_of(&dispatcher, get(path)).await,
            Some(StatusCode::UNAUTHORIZED),
            "flagged syntactic chain must claim '{path}'"
        );
    }
}

/// A matcher that declares its own mount prefix only claims requests the
/// host serves under that prefix.
#[tokio::test]
async fn declared_mount_prefix_limits_coverage() {
    let table = Arc::new(StaticRouteTable::new());
    table.register("/path");
    table.register("/never-match");

    let mut guarded = RoutePatternConfig::new("/path");
    guarded.mount_prefix = Some("/spring".to_string());
    let mut never = RoutePatternConfig::new("/never-match");
    never.mount_prefix = Some("/spring".to_string());

    let matcher = MatcherSet::new()
        .with(PathPattern::RouteTable(RoutePattern::new(
            guarded,
            table.clone(),
        )))
        .with(PathPattern::RouteTable(RoutePattern::new(never, table)));

    let dispatcher =
        ChainDispatcher::build(vec![ChainRegistration::new("spring", 0, matcher, deny())]);

    // Served under /spring: the chain claims it.
    let under_spring = DispatchRequest::new(HttpMethod::Get, "/spring/path")
        .with_mount_prefix("/spring");
    assert_eq!(
        status_of(&dispatcher, under_spring).await,
        Some(StatusCode::UNAUTHORIZED)
    );

    // Served at the root: different mount, passes through.
    let at_root = get("/path");
    assert!(dispatcher.dispatch(at_root).await.unwrap().is_unmatched());

    // Served under another mount: passes through as well.
    let under_other = DispatchRequest::new(HttpMethod::Get, "/other/path")
        .with_mount_prefix("/other");
    assert!(dispatcher.dispatch(under_other).await.unwrap().is_unmatched());
}

/// Two chains both match; the lower priority value wins on every declared
/// path, even where the later chain would have permitted the request.
#[tokio::test]
async fn higher_priority_deny_shadows_lower_priority_permit() {
    let first = MatcherSet::new()
        .with(PathPattern::Syntactic(SyntacticPattern::literal("/test-1").unwrap()))
        .with(PathPattern::Syntactic(SyntacticPattern::literal("/test-2").unwrap()))
        .with(PathPattern::Syntactic(SyntacticPattern::literal("/test-3").unwrap()));

    let second = MatcherSet::from(PathPattern::Syntactic(
        SyntacticPattern::literal("/test-1").unwrap(),
    ));

    let dispatcher = ChainDispatcher::build(vec![
        ChainRegistration::new("first", i32::MIN, first, deny()),
        ChainRegistration::new("second", 0, second, permit()),
    ]);

    for path in ["/test-1", "/test-2", "/test-3"] {
        let outcome = dispatcher.dispatch(get(path)).await.unwrap();
        assert_eq!(outcome.chain(), Some("first"), "'{path}' must hit the deny chain");
        assert_eq!(
            outcome.response().map(|r| r.status),
            Some(StatusCode::UNAUTHORIZED)
        );
    }
}

/// The classic guarded-app layout: a deny chain on one path, a permissive
/// catch-all behind it.
#[tokio::test]
async fn guarded_path_with_permissive_catch_all() {
    let dispatcher = ChainDispatcher::build(vec![
        ChainRegistration::new(
            "guarded",
            0,
            MatcherSet::from(PathPattern::Syntactic(
                SyntacticPattern::literal("/path").unwrap(),
            )),
            deny(),
        ),
        ChainRegistration::new("open", 1, MatcherSet::any(), permit()),
    ]);

    assert_eq!(
        status_of(&dispatcher, get("/path")).await,
        Some(StatusCode::UNAUTHORIZED)
    );

    let open = dispatcher.dispatch(get("/other")).await.unwrap();
    assert!(matches!(open, DispatchOutcome::Forwarded(_)));
}

/// Resolution never errors outward: a matcher whose resolver fails simply
/// stops claiming requests, and the sweep carries on to later chains.
#[tokio::test]
async fn broken_matcher_falls_through_to_later_chains() {
    #[derive(Debug)]
    struct BrokenResolver;

    impl warden::RouteResolver for BrokenResolver {
        fn resolves(
            &self,
            _: &str,
            _: &str,
            _: &str,
        ) -> Result<bool, warden::DispatchError> {
            Err(warden::DispatchError::MatcherError(
                "route table never populated".to_string(),
            ))
        }
    }

    let broken = MatcherSet::from(PathPattern::RouteTable(RoutePattern::new(
        RoutePatternConfig::new("/path"),
        Arc::new(BrokenResolver),
    )));

    let dispatcher = ChainDispatcher::build(vec![
        ChainRegistration::new("broken", 0, broken, permit()),
        ChainRegistration::new("fallback", 1, MatcherSet::any(), deny()),
    ]);

    // The broken chain can never grant access; the deny fallback claims
    // everything instead.
    let outcome = dispatcher.dispatch(get("/path")).await.unwrap();
    assert_eq!(outcome.chain(), Some("fallback"));
    assert_eq!(
        outcome.response().map(|r| r.status),
        Some(StatusCode::UNAUTHORIZED)
    );
}

/// `resolve` is a pure read; many tasks can resolve against the same
/// dispatcher at once.
#[tokio::test]
async fn concurrent_resolution_is_safe() {
    let dispatcher = Arc::new(ChainDispatcher::build(vec![
        ChainRegistration::new(
            "a",
            0,
            MatcherSet::from(PathPattern::Syntactic(
                SyntacticPattern::literal("/a/**").unwrap(),
            )),
            deny(),
        ),
        ChainRegistration::new("rest", 1, MatcherSet::any(), permit()),
    ]));

    let mut handles = Vec::new();
    for i in 0..16 {
        let dispatcher = dispatcher.clone();
        handles.push(tokio::spawn(async move {
            let path = if i % 2 == 0 { "/a/secret" } else { "/open" };
            let outcome = dispatcher.dispatch(get(path)).await.unwrap();
            if i % 2 == 0 {
                assert_eq!(outcome.chain(), Some("a"));
            } else {
                assert!(matches!(outcome, DispatchOutcome::Forwarded(_)));
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}
