//! Mock server helpers for the reqwest transport
//!
//! Provides utilities for setting up wiremock mock servers with the response
//! patterns retry tests need.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Set up an endpoint that answers `fail_status` for the first `fail_count`
/// requests and `200` with `content` afterwards
pub async fn mock_flaky_endpoint(
    server: &MockServer,
    http_method: &str,
    endpoint: &str,
    fail_status: u16,
    fail_count: u64,
    content: &str,
) {
    // First N requests fail
    Mock::given(method(http_method))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(fail_status).set_body_string("retry"))
        .up_to_n_times(fail_count)
        .mount(server)
        .await;

    // Subsequent requests succeed
    Mock::given(method(http_method))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_string(content))
        .mount(server)
        .await;
}

/// Set up an endpoint that always answers `status`
pub async fn mock_failing_endpoint(server: &MockServer, endpoint: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Number of requests the server has received
pub async fn received_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}

/// Bodies of the requests the server has received, in order
pub async fn received_bodies(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|request| String::from_utf8_lossy(&request.body).into_owned())
        .collect()
}
