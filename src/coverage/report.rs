//! Introspection reporter.
//!
//! Serves the endpoint listings behind `GET /endpoints` and
//! `GET /endpoints/unhit`:
//!
//! ```text
//! [
//!     {
//!       "Method": "GET",
//!       "Path": "/users/:id",
//!       "Hits": 3
//!     }
//!   ]
//! ```
//!
//! Entries are sorted by path, then method.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use thiserror::Error;

use crate::coverage::registry::{Endpoint, EndpointFilter, EndpointRegistry};
use crate::routing::handler::{Handler, Params};

const INDENT: &[u8] = b"  ";
const LINE_PREFIX: &[u8] = b"  ";

/// Failure to encode an endpoint listing.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to encode endpoints: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Encode endpoints as an indented JSON array.
///
/// Every line after the first carries a two-space prefix.
pub fn render(mut endpoints: Vec<Endpoint>) -> Result<Vec<u8>, ReportError> {
    endpoints.sort_by(|a, b| (&a.path, &a.method).cmp(&(&b.path, &b.method)));

    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    endpoints.serialize(&mut ser)?;

    let mut out = Vec::with_capacity(buf.len() + buf.len() / 4);
    for byte in buf {
        out.push(byte);
        if byte == b'\n' {
            out.extend_from_slice(LINE_PREFIX);
        }
    }
    Ok(out)
}

/// Turn a rendered listing into the HTTP response.
pub fn respond(rendered: Result<Vec<u8>, ReportError>) -> Response {
    match rendered {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render endpoint listing");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Handler serving the registry listing under `filter`.
pub fn listing_handler(registry: Arc<EndpointRegistry>, filter: EndpointFilter) -> impl Handler {
    move |_request: Request<Body>, _params: Params| {
        let rendered = render(registry.list(filter));
        async move { respond(rendered) }
    }
}
