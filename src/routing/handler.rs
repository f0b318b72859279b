//! Handler abstraction and captured path parameters.
//!
//! # Responsibilities
//! - Define the `Handler` capability invoked by the dispatcher
//! - Carry named path parameters extracted by the matcher
//! - Describe a recovered handler panic for the panic hook
//!
//! # Design Decisions
//! - Handlers are type-erased behind `Arc<dyn Handler>` so routes of
//!   different closure types live in one table
//! - Any async closure `Fn(Request, Params) -> impl Future<Output = impl IntoResponse>`
//!   is a handler, no wrapper type needed at registration sites

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Uri};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;

/// A request handler that can be registered on a route.
pub trait Handler: Send + Sync + 'static {
    /// Handle one request with the parameters captured from its path.
    fn call(&self, request: Request<Body>, params: Params) -> BoxFuture<'static, Response>;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request<Body>, Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    fn call(&self, request: Request<Body>, params: Params) -> BoxFuture<'static, Response> {
        let fut = (self)(request, params);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// Shared, type-erased handler.
pub type BoxHandler = Arc<dyn Handler>;

/// Path parameters captured during route lookup, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    pub(crate) fn pop(&mut self) {
        self.pairs.pop();
    }

    /// Value captured under `name`, if the matched pattern declared it.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A handler panic caught by the dispatcher.
pub struct HandlerPanic {
    pub method: Method,
    pub uri: Uri,
    pub payload: Box<dyn Any + Send>,
}

impl HandlerPanic {
    /// The panic message, when the payload is a string.
    pub fn message(&self) -> Option<&str> {
        if let Some(s) = self.payload.downcast_ref::<&'static str>() {
            Some(s)
        } else {
            self.payload.downcast_ref::<String>().map(String::as_str)
        }
    }
}

impl std::fmt::Debug for HandlerPanic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerPanic")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("message", &self.message())
            .finish()
    }
}

/// Recovers from a handler panic by producing the response to send.
pub type PanicHandler = Arc<dyn Fn(HandlerPanic) -> Response + Send + Sync>;

/// Methods that would have matched the path, attached to requests handed to
/// the method-not-allowed handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedMethods(pub Vec<Method>);

impl AllowedMethods {
    /// Render as an `Allow` header value, e.g. `GET, POST`.
    pub fn header_value(&self) -> String {
        self.0
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
