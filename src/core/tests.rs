// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use http::StatusCode;

use super::*;

#[test]
fn method_tokens_parse_case_insensitively() {
    assert_eq!(HttpMethod::from_token("get"), Some(HttpMethod::Get));
    assert_eq!(HttpMethod::from_token("GET"), Some(HttpMethod::Get));
    assert_eq!(HttpMethod::from_token("gEt"), Some(HttpMethod::Get));
    assert_eq!(HttpMethod::from_token("DELETE"), Some(HttpMethod::Delete));
    assert_eq!(HttpMethod::from_token(" options "), Some(HttpMethod::Options));
    assert_eq!(HttpMethod::from_token("BREW"), None);
    assert_eq!(HttpMethod::from_token(""), None);
}

#[test]
fn method_display_round_trips_through_from_token() {
    for method in [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Patch,
        HttpMethod::Trace,
        HttpMethod::Connect,
    ] {
        assert_eq!(HttpMethod::from_token(&method.to_string()), Some(method));
    }
}

#[test]
fn route_path_strips_mount_prefix() {
    let request =
        DispatchRequest::new(HttpMethod::Get, "/spring/path").with_mount_prefix("/spring");
    assert_eq!(request.route_path(), "/path");
}

#[test]
fn route_path_without_mount_prefix_is_the_full_path() {
    let request = DispatchRequest::new(HttpMethod::Get, "/path");
    assert_eq!(request.route_path(), "/path");
}

#[test]
fn route_path_requires_a_segment_boundary() {
    // "/springfield" is not mounted under "/spring".
    let request =
        DispatchRequest::new(HttpMethod::Get, "/springfield/path").with_mount_prefix("/spring");
    assert_eq!(request.route_path(), "/springfield/path");
}

#[test]
fn route_path_of_the_mount_itself_is_empty() {
    let request = DispatchRequest::new(HttpMethod::Get, "/spring").with_mount_prefix("/spring");
    assert_eq!(request.route_path(), "");
}

#[test]
fn response_builder_sets_header_and_body() {
    let response = DispatchResponse::new(StatusCode::UNAUTHORIZED)
        .with_header("www-authenticate", "Basic realm=\"warden\"")
        .with_body("denied");

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers.get("www-authenticate").map(|v| v.to_str().ok()),
        Some(Some("Basic realm=\"warden\""))
    );
    assert_eq!(&response.body[..], b"denied");
}

#[test]
fn response_builder_skips_invalid_headers() {
    let response = DispatchResponse::new(StatusCode::OK).with_header("bad header", "value");
    assert!(response.headers.is_empty());
}

#[test]
fn cloned_requests_share_their_context() {
    let request = DispatchRequest::new(HttpMethod::Get, "/path");
    let clone = request.clone();
    assert!(Arc::ptr_eq(&request.context, &clone.context));
}

#[test]
fn outcome_accessors() {
    let handled = DispatchOutcome::Handled {
        chain: "app".to_string(),
        response: DispatchResponse::new(StatusCode::FORBIDDEN),
    };
    assert!(!handled.is_unmatched());
    assert_eq!(handled.chain(), Some("app"));
    assert_eq!(
        handled.response().map(|r| r.status),
        Some(StatusCode::FORBIDDEN)
    );

    let unmatched = DispatchOutcome::Unmatched(DispatchRequest::new(HttpMethod::Get, "/other"));
    assert!(unmatched.is_unmatched());
    assert!(unmatched.response().is_none());
    assert!(unmatched.chain().is_none());
}
