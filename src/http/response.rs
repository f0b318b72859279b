//! Default responses.
//!
//! # Responsibilities
//! - Generic 404 and 405 responders used when no collaborator is configured
//! - Automatic `OPTIONS` replies
//! - Trailing-slash and fixed-path redirects
//!
//! # Design Decisions
//! - Plain-text bodies; only the introspection routes speak JSON
//! - 405 always carries an `Allow` header

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};

/// 404 with a short text body.
pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 page not found").into_response()
}

/// 405 listing the allowed methods, e.g. `GET, POST`.
pub fn method_not_allowed(allow: &str) -> Response {
    let mut response = (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response();
    set_allow(&mut response, allow);
    response
}

/// Empty 200 answering an `OPTIONS` request, e.g. `Allow: GET, OPTIONS`.
pub fn options(allow: &str) -> Response {
    let mut response = StatusCode::OK.into_response();
    set_allow(&mut response, allow);
    response
}

/// Set `Allow` unless the response already carries one.
pub fn set_allow(response: &mut Response, allow: &str) {
    if response.headers().contains_key(header::ALLOW) {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(allow) {
        response.headers_mut().insert(header::ALLOW, value);
    }
}

/// Permanent redirect to `location`.
///
/// GET keeps the classic 301; other methods get 308 so clients replay the
/// method and body.
pub fn redirect(method: &Method, location: &str) -> Response {
    let status = if *method == Method::GET {
        StatusCode::MOVED_PERMANENTLY
    } else {
        StatusCode::PERMANENT_REDIRECT
    };
    match HeaderValue::from_str(location) {
        Ok(value) => (status, [(header::LOCATION, value)]).into_response(),
        Err(_) => not_found(),
    }
}

/// 500 used when a recovered panic has no better answer.
pub fn internal_error(message: &str) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, message.to_string()).into_response()
}
