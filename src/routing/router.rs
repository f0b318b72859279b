//! Route registration and dispatch.
//!
//! # Responsibilities
//! - Register handlers per (method, pattern) and record an Endpoint for each
//! - Resolve each request and invoke the matched handler
//! - Count exactly one hit per matched dispatch, whatever the handler does
//! - Match on the percent-decoded path
//! - Redirect misses to a routed spelling of the path, answer `OPTIONS`
//! - Hand misses to the not-found / method-not-allowed collaborators
//! - Recover handler panics through the optional panic handler
//!
//! # Design Decisions
//! - Two phases: a mutable `RouterBuilder` takes every registration, then
//!   `build()` freezes it into an immutable `HitRouter`. Lookups never lock
//! - Hits are recorded by a drop guard, so panics, errors and cancelled
//!   futures (e.g. timeouts) all count
//! - Without a panic handler the panic is resumed after the hit is counted
//! - `HitRouter` is a `tower::Service`, so any axum/hyper host can mount it

use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tower::{Service, ServiceExt};
use tower_http::services::ServeDir;

use crate::config::RouterConfig;
use crate::coverage::registry::{Endpoint, EndpointFilter, EndpointId, EndpointRegistry};
use crate::coverage::report;
use crate::http::response;
use crate::observability::metrics::{self, Outcome};
use crate::routing::handler::{
    AllowedMethods, BoxHandler, Handler, HandlerPanic, PanicHandler, Params,
};
use crate::routing::matcher::{Lookup, RouteError, RouteTable};
use crate::routing::path;

/// Catch-all name required by `serve_files` patterns.
const FILEPATH_PARAM: &str = "filepath";

struct Route {
    endpoint: EndpointId,
    method: Method,
    pattern: String,
    handler: BoxHandler,
}

/// Counts one hit for its route when dropped.
struct HitGuard<'a> {
    registry: &'a EndpointRegistry,
    route: &'a Route,
}

impl Drop for HitGuard<'_> {
    fn drop(&mut self) {
        self.registry.hit(self.route.endpoint);
        metrics::record_hit(self.route.method.as_str(), &self.route.pattern);
    }
}

/// Collects routes and collaborators before serving starts.
pub struct RouterBuilder {
    config: RouterConfig,
    table: RouteTable<Route>,
    registry: Arc<EndpointRegistry>,
    not_found: Option<BoxHandler>,
    method_not_allowed: Option<BoxHandler>,
    panic_handler: Option<PanicHandler>,
}

impl RouterBuilder {
    /// Create a builder with the introspection routes already registered
    /// (unless disabled in `config`).
    pub fn new(config: RouterConfig) -> Result<Self, RouteError> {
        let mut builder = Self {
            config,
            table: RouteTable::new(),
            registry: Arc::new(EndpointRegistry::new()),
            not_found: None,
            method_not_allowed: None,
            panic_handler: None,
        };

        if builder.config.introspection.enabled {
            let all_path = builder.config.introspection.path.clone();
            let unhit_path = builder.config.introspection.unhit_path();
            let registry = builder.registry.clone();

            builder.insert(
                Method::GET,
                &all_path,
                Arc::new(report::listing_handler(registry.clone(), EndpointFilter::All)),
                true,
            )?;
            builder.insert(
                Method::GET,
                &unhit_path,
                Arc::new(report::listing_handler(registry, EndpointFilter::Unhit)),
                true,
            )?;
        }

        Ok(builder)
    }

    fn insert(
        &mut self,
        method: Method,
        path: &str,
        handler: BoxHandler,
        internal: bool,
    ) -> Result<EndpointId, RouteError> {
        let registry = &self.registry;
        let route = self.table.insert_with(method.clone(), path, || {
            let endpoint = if internal {
                registry.record_internal(&method, path)
            } else {
                registry.record(&method, path)
            };
            Route {
                endpoint,
                method: method.clone(),
                pattern: path.to_string(),
                handler,
            }
        })?;

        tracing::debug!(
            endpoint_id = %route.endpoint,
            method = %route.method,
            path = %route.pattern,
            "Route registered"
        );
        Ok(route.endpoint)
    }

    /// Register `handler` for (method, path).
    pub fn route<H: Handler>(
        &mut self,
        method: Method,
        path: &str,
        handler: H,
    ) -> Result<EndpointId, RouteError> {
        self.insert(method, path, Arc::new(handler), false)
    }

    pub fn get<H: Handler>(&mut self, path: &str, handler: H) -> Result<EndpointId, RouteError> {
        self.route(Method::GET, path, handler)
    }

    pub fn head<H: Handler>(&mut self, path: &str, handler: H) -> Result<EndpointId, RouteError> {
        self.route(Method::HEAD, path, handler)
    }

    pub fn options<H: Handler>(&mut self, path: &str, handler: H) -> Result<EndpointId, RouteError> {
        self.route(Method::OPTIONS, path, handler)
    }

    pub fn post<H: Handler>(&mut self, path: &str, handler: H) -> Result<EndpointId, RouteError> {
        self.route(Method::POST, path, handler)
    }

    pub fn put<H: Handler>(&mut self, path: &str, handler: H) -> Result<EndpointId, RouteError> {
        self.route(Method::PUT, path, handler)
    }

    pub fn patch<H: Handler>(&mut self, path: &str, handler: H) -> Result<EndpointId, RouteError> {
        self.route(Method::PATCH, path, handler)
    }

    pub fn delete<H: Handler>(&mut self, path: &str, handler: H) -> Result<EndpointId, RouteError> {
        self.route(Method::DELETE, path, handler)
    }

    /// Serve files under `root` for GET requests matching `pattern`.
    ///
    /// The pattern must end in `/*filepath`, e.g. `/static/*filepath`; the
    /// captured remainder is resolved against `root`.
    pub fn serve_files(
        &mut self,
        pattern: &str,
        root: impl Into<PathBuf>,
    ) -> Result<EndpointId, RouteError> {
        if !pattern.ends_with("/*filepath") {
            return Err(RouteError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "file server pattern must end with '/*filepath'",
            });
        }

        let service = ServeDir::new(root.into());
        self.get(pattern, move |request: Request<Body>, params: Params| {
            serve_file(service.clone(), request, params)
        })
    }

    /// Handler for requests no route matches. Defaults to a plain 404.
    pub fn not_found<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.not_found = Some(Arc::new(handler));
        self
    }

    /// Handler for paths routed only under other methods. Defaults to a
    /// plain 405. The request carries an `AllowedMethods` extension.
    pub fn method_not_allowed<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.method_not_allowed = Some(Arc::new(handler));
        self
    }

    /// Recover handler panics instead of propagating them to the host.
    pub fn panic_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(HandlerPanic) -> Response + Send + Sync + 'static,
    {
        self.panic_handler = Some(Arc::new(handler));
        self
    }

    /// Freeze the routes. No registration is possible afterwards.
    pub fn build(self) -> HitRouter {
        tracing::info!(endpoints = self.registry.len(), "Router built");
        HitRouter {
            inner: Arc::new(Inner {
                config: self.config,
                table: self.table,
                registry: self.registry,
                not_found: self.not_found,
                method_not_allowed: self.method_not_allowed,
                panic_handler: self.panic_handler,
            }),
        }
    }
}

async fn serve_file(service: ServeDir, request: Request<Body>, params: Params) -> Response {
    let filepath = params.get(FILEPATH_PARAM).unwrap_or_default();
    let (mut parts, body) = request.into_parts();
    parts.uri = match format!("/{}", path::encode(filepath)).parse::<Uri>() {
        Ok(uri) => uri,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    match service.oneshot(Request::from_parts(parts, body)).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

struct Inner {
    config: RouterConfig,
    table: RouteTable<Route>,
    registry: Arc<EndpointRegistry>,
    not_found: Option<BoxHandler>,
    method_not_allowed: Option<BoxHandler>,
    panic_handler: Option<PanicHandler>,
}

/// Immutable, hit-counting request router. Cheap to clone.
#[derive(Clone)]
pub struct HitRouter {
    inner: Arc<Inner>,
}

impl HitRouter {
    /// The registry backing the hit counters.
    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.inner.registry
    }

    /// Snapshot of the endpoints, introspection routes excluded.
    pub fn endpoints(&self, filter: EndpointFilter) -> Vec<Endpoint> {
        self.inner.registry.list(filter)
    }

    /// Dispatch one request.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let method = request.method().clone();
        let path = path::decode(request.uri().path()).into_owned();

        match self.inner.table.lookup(&method, &path) {
            Lookup::Found { value, params } => self.dispatch(value, request, params).await,
            Lookup::MethodNotAllowed(allowed) => {
                if let Some(redirect) = self.redirect(&method, &path, request.uri()) {
                    return redirect;
                }
                if method == Method::OPTIONS && self.inner.config.handle_options {
                    return self.answer_options(&path, allowed);
                }
                if self.inner.config.handle_method_not_allowed {
                    self.reject_method(request, allowed).await
                } else {
                    self.miss(request).await
                }
            }
            Lookup::NotFound => {
                if let Some(redirect) = self.redirect(&method, &path, request.uri()) {
                    return redirect;
                }
                if method == Method::OPTIONS && self.inner.config.handle_options && path == "*" {
                    return self.answer_options(&path, self.inner.table.methods());
                }
                self.miss(request).await
            }
        }
    }

    async fn dispatch(&self, route: &Route, mut request: Request<Body>, params: Params) -> Response {
        tracing::debug!(
            endpoint_id = %route.endpoint,
            method = %route.method,
            path = %route.pattern,
            "Dispatching request"
        );
        metrics::record_outcome(Outcome::Matched);

        request.extensions_mut().insert(params.clone());
        let _hit = HitGuard {
            registry: &self.inner.registry,
            route,
        };
        self.run(&route.handler, request, params).await
    }

    /// Invoke a handler, catching panics raised while building or polling
    /// its future.
    async fn run(&self, handler: &BoxHandler, request: Request<Body>, params: Params) -> Response {
        let method = request.method().clone();
        let uri = request.uri().clone();

        let result = match std::panic::catch_unwind(AssertUnwindSafe(|| handler.call(request, params))) {
            Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await,
            Err(payload) => Err(payload),
        };

        match result {
            Ok(response) => response,
            Err(payload) => self.recover(HandlerPanic {
                method,
                uri,
                payload,
            }),
        }
    }

    fn recover(&self, panic: HandlerPanic) -> Response {
        metrics::record_outcome(Outcome::Panic);
        match &self.inner.panic_handler {
            Some(handler) => {
                tracing::error!(
                    method = %panic.method,
                    uri = %panic.uri,
                    message = ?panic.message(),
                    "Handler panicked, recovering"
                );
                handler(panic)
            }
            None => {
                tracing::error!(
                    method = %panic.method,
                    uri = %panic.uri,
                    message = ?panic.message(),
                    "Handler panicked, no panic handler configured"
                );
                std::panic::resume_unwind(panic.payload)
            }
        }
    }

    async fn miss(&self, request: Request<Body>) -> Response {
        tracing::debug!(method = %request.method(), path = %request.uri().path(), "No route matched");
        metrics::record_outcome(Outcome::NotFound);

        match &self.inner.not_found {
            Some(handler) => self.run(handler, request, Params::new()).await,
            None => response::not_found(),
        }
    }

    async fn reject_method(&self, mut request: Request<Body>, allowed: Vec<Method>) -> Response {
        let allowed = AllowedMethods(allowed);
        let allow = allowed.header_value();
        tracing::debug!(
            method = %request.method(),
            path = %request.uri().path(),
            allow = %allow,
            "Method not allowed"
        );
        metrics::record_outcome(Outcome::MethodNotAllowed);

        match &self.inner.method_not_allowed {
            Some(handler) => {
                request.extensions_mut().insert(allowed);
                let mut response = self.run(handler, request, Params::new()).await;
                response::set_allow(&mut response, &allow);
                response
            }
            None => response::method_not_allowed(&allow),
        }
    }

    /// Automatic `OPTIONS` reply for a path routed under other methods, or
    /// for the whole server when `path` is `*`.
    fn answer_options(&self, path: &str, mut allowed: Vec<Method>) -> Response {
        if !allowed.contains(&Method::OPTIONS) {
            allowed.push(Method::OPTIONS);
        }
        let allow = AllowedMethods(allowed).header_value();
        tracing::debug!(path = %path, allow = %allow, "Automatic OPTIONS reply");
        metrics::record_outcome(Outcome::Options);
        response::options(&allow)
    }

    /// Redirect a miss to the routed spelling of `path`: trailing slash
    /// added or removed first, then the cleaned, case-insensitive match.
    fn redirect(&self, method: &Method, path: &str, uri: &Uri) -> Option<Response> {
        if *method == Method::CONNECT || path == "/" || !path.starts_with('/') {
            return None;
        }

        let target = self
            .trailing_slash_target(method, path)
            .or_else(|| self.fixed_path_target(method, path))
            .filter(|target| target != path)?;

        let encoded = path::encode(&target);
        let location = match uri.query() {
            Some(query) => format!("{encoded}?{query}"),
            None => encoded,
        };
        tracing::debug!(from = %uri.path(), to = %location, "Redirecting to routed path");
        metrics::record_outcome(Outcome::Redirect);
        Some(response::redirect(method, &location))
    }

    fn trailing_slash_target(&self, method: &Method, path: &str) -> Option<String> {
        if !self.inner.config.redirect_trailing_slash {
            return None;
        }
        let twin = toggle_trailing_slash(path)?;
        self.inner.table.has_route(method, &twin).then_some(twin)
    }

    fn fixed_path_target(&self, method: &Method, path: &str) -> Option<String> {
        if !self.inner.config.redirect_fixed_path {
            return None;
        }
        let cleaned = path::clean(path);
        if let Some(fixed) = self.inner.table.fixed_path(method, &cleaned) {
            return Some(fixed);
        }
        if !self.inner.config.redirect_trailing_slash {
            return None;
        }
        let twin = toggle_trailing_slash(&cleaned)?;
        self.inner.table.fixed_path(method, &twin)
    }
}

/// `/a/` for `/a` and the reverse. `None` for the root.
fn toggle_trailing_slash(path: &str) -> Option<String> {
    match path.strip_suffix('/') {
        Some("") => None,
        Some(stripped) => Some(stripped.to_string()),
        None => Some(format!("{path}/")),
    }
}

impl Service<Request<Body>> for HitRouter {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let router = self.clone();
        Box::pin(async move { Ok(router.handle(request).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use std::time::Duration;

    fn builder() -> RouterBuilder {
        RouterBuilder::new(RouterConfig::default()).unwrap()
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn hits(router: &HitRouter, id: EndpointId) -> u64 {
        router.registry().get(id).unwrap().hits
    }

    async fn ok(_request: Request<Body>, _params: Params) -> &'static str {
        "ok"
    }

    #[tokio::test]
    async fn test_dispatch_counts_hit() {
        let mut builder = builder();
        let id = builder.get("/a", ok).unwrap();
        let router = builder.build();

        assert_eq!(hits(&router, id), 0);
        let response = router.handle(request(Method::GET, "/a")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");
        assert_eq!(hits(&router, id), 1);
    }

    #[tokio::test]
    async fn test_params_reach_handler() {
        let mut builder = builder();
        let id = builder
            .get("/users/:id", |request: Request<Body>, params: Params| async move {
                let from_extension = request
                    .extensions()
                    .get::<Params>()
                    .and_then(|p| p.get("id"))
                    .map(str::to_string);
                format!("{}:{}", params.get("id").unwrap_or("-"), from_extension.unwrap_or_default())
            })
            .unwrap();
        let router = builder.build();

        for user in ["7", "8", "9"] {
            let response = router.handle(request(Method::GET, &format!("/users/{user}"))).await;
            assert_eq!(body_string(response).await, format!("{user}:{user}"));
        }
        assert_eq!(hits(&router, id), 3);
        assert_eq!(router.endpoints(EndpointFilter::All).len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_leaves_registry_untouched() {
        let mut builder = builder();
        let id = builder.get("/a", ok).unwrap();
        let router = builder.build();

        let response = router.handle(request(Method::GET, "/zzz")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(hits(&router, id), 0);
        assert!(router.endpoints(EndpointFilter::All).iter().all(|e| e.hits == 0));
    }

    #[tokio::test]
    async fn test_custom_not_found() {
        let mut builder = builder();
        builder.not_found(|_request: Request<Body>, _params: Params| async {
            (StatusCode::IM_A_TEAPOT, "nothing here")
        });
        let router = builder.build();

        let response = router.handle(request(Method::GET, "/missing")).await;
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let mut builder = builder();
        builder.get("/only-get", ok).unwrap();
        let router = builder.build();

        let response = router.handle(request(Method::POST, "/only-get")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET");
    }

    #[tokio::test]
    async fn test_custom_method_not_allowed_sees_allowed_methods() {
        let mut builder = builder();
        builder.get("/thing", ok).unwrap();
        builder.put("/thing", ok).unwrap();
        builder.method_not_allowed(|request: Request<Body>, _params: Params| async move {
            let allowed = request.extensions().get::<AllowedMethods>().cloned();
            (
                StatusCode::METHOD_NOT_ALLOWED,
                allowed.map(|a| a.header_value()).unwrap_or_default(),
            )
        });
        let router = builder.build();

        let response = router.handle(request(Method::DELETE, "/thing")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, PUT");
        assert_eq!(body_string(response).await, "GET, PUT");
    }

    #[tokio::test]
    async fn test_method_not_allowed_disabled_falls_back_to_not_found() {
        let mut config = RouterConfig::default();
        config.handle_method_not_allowed = false;
        let mut builder = RouterBuilder::new(config).unwrap();
        builder.get("/only-get", ok).unwrap();
        let router = builder.build();

        let response = router.handle(request(Method::POST, "/only-get")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_trailing_slash_redirect() {
        let mut builder = builder();
        builder.get("/a", ok).unwrap();
        builder.post("/b/", ok).unwrap();
        let router = builder.build();

        let response = router.handle(request(Method::GET, "/a/?q=1")).await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/a?q=1");

        let response = router.handle(request(Method::POST, "/b")).await;
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/b/");
    }

    #[tokio::test]
    async fn test_trailing_slash_redirect_disabled() {
        let mut config = RouterConfig::default();
        config.redirect_trailing_slash = false;
        let mut builder = RouterBuilder::new(config).unwrap();
        builder.get("/a", ok).unwrap();
        let router = builder.build();

        let response = router.handle(request(Method::GET, "/a/")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_encoded_captures_are_decoded() {
        let mut builder = builder();
        let user = builder
            .get("/users/:name", |_request: Request<Body>, params: Params| async move {
                params.get("name").unwrap_or_default().to_string()
            })
            .unwrap();
        builder
            .get("/files/*rest", |_request: Request<Body>, params: Params| async move {
                params.get("rest").unwrap_or_default().to_string()
            })
            .unwrap();
        let router = builder.build();

        let response = router.handle(request(Method::GET, "/users/John%20Doe")).await;
        assert_eq!(body_string(response).await, "John Doe");

        let response = router
            .handle(request(Method::GET, "/files/caf%C3%A9/100%25%20done.txt"))
            .await;
        assert_eq!(body_string(response).await, "café/100% done.txt");
        assert_eq!(hits(&router, user), 1);
    }

    #[tokio::test]
    async fn test_encoded_static_path_matches() {
        let mut builder = builder();
        let id = builder.get("/hello world", ok).unwrap();
        let router = builder.build();

        let response = router.handle(request(Method::GET, "/hello%20world")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits(&router, id), 1);
    }

    #[tokio::test]
    async fn test_automatic_options_reply() {
        let mut builder = builder();
        let a = builder.get("/a", ok).unwrap();
        builder.post("/a", ok).unwrap();
        let router = builder.build();

        let response = router.handle(request(Method::OPTIONS, "/a")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ALLOW], "GET, POST, OPTIONS");
        assert_eq!(body_string(response).await, "");
        assert!(router.endpoints(EndpointFilter::All).iter().all(|e| e.hits == 0));
        assert_eq!(hits(&router, a), 0);

        let response = router.handle(request(Method::OPTIONS, "*")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ALLOW], "GET, POST, OPTIONS");

        let response = router.handle(request(Method::OPTIONS, "/nowhere")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_registered_options_route_wins() {
        let mut builder = builder();
        builder.get("/a", ok).unwrap();
        let id = builder
            .options("/a", |_request: Request<Body>, _params: Params| async {
                (StatusCode::NO_CONTENT, [(header::ALLOW, "GET")])
            })
            .unwrap();
        let router = builder.build();

        let response = router.handle(request(Method::OPTIONS, "/a")).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[header::ALLOW], "GET");
        assert_eq!(hits(&router, id), 1);
    }

    #[tokio::test]
    async fn test_automatic_options_disabled() {
        let mut config = RouterConfig::default();
        config.handle_options = false;
        let mut builder = RouterBuilder::new(config).unwrap();
        builder.get("/a", ok).unwrap();
        let router = builder.build();

        let response = router.handle(request(Method::OPTIONS, "/a")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET");
    }

    #[tokio::test]
    async fn test_fixed_path_redirect() {
        let mut builder = builder();
        let id = builder.get("/b", ok).unwrap();
        builder.get("/Users/:name", ok).unwrap();
        builder.put("/docs/", ok).unwrap();
        let router = builder.build();

        let response = router.handle(request(Method::GET, "//a/../b?x=1")).await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/b?x=1");

        let response = router.handle(request(Method::GET, "/B")).await;
        assert_eq!(response.headers()[header::LOCATION], "/b");

        let response = router.handle(request(Method::GET, "/users/Jane%20Roe")).await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/Users/Jane%20Roe");

        // Case and trailing slash fixed together.
        let response = router.handle(request(Method::PUT, "/DOCS")).await;
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/docs/");

        assert_eq!(hits(&router, id), 0);
    }

    #[tokio::test]
    async fn test_fixed_path_redirect_disabled() {
        let mut config = RouterConfig::default();
        config.redirect_fixed_path = false;
        let mut builder = RouterBuilder::new(config).unwrap();
        builder.get("/b", ok).unwrap();
        let router = builder.build();

        let response = router.handle(request(Method::GET, "/B")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = router.handle(request(Method::GET, "/x/../b")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_panic_recovered_and_counted() {
        let mut builder = builder();
        let id = builder
            .get("/boom", |_request: Request<Body>, _params: Params| async {
                if true {
                    panic!("kaboom");
                }
                "unreachable"
            })
            .unwrap();
        builder.panic_handler(|panic: HandlerPanic| {
            response::internal_error(panic.message().unwrap_or("panic"))
        });
        let router = builder.build();

        let response = router.handle(request(Method::GET, "/boom")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "kaboom");
        assert_eq!(hits(&router, id), 1);
    }

    struct PanicsOnCall;

    impl Handler for PanicsOnCall {
        fn call(&self, _request: Request<Body>, _params: Params) -> BoxFuture<'static, Response> {
            panic!("before any future exists")
        }
    }

    #[tokio::test]
    async fn test_synchronous_panic_recovered_and_counted() {
        let mut builder = builder();
        let id = builder.get("/sync-boom", PanicsOnCall).unwrap();
        builder.panic_handler(|_panic: HandlerPanic| StatusCode::SERVICE_UNAVAILABLE.into_response());
        let router = builder.build();

        let response = router.handle(request(Method::GET, "/sync-boom")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(hits(&router, id), 1);
    }

    #[tokio::test]
    async fn test_panic_propagates_without_handler_but_counts() {
        let mut builder = builder();
        let id = builder
            .get("/boom", |_request: Request<Body>, _params: Params| async {
                if true {
                    panic!("unhandled");
                }
                "unreachable"
            })
            .unwrap();
        let router = builder.build();

        let task_router = router.clone();
        let result = tokio::spawn(async move { task_router.handle(request(Method::GET, "/boom")).await }).await;

        assert!(result.unwrap_err().is_panic());
        assert_eq!(hits(&router, id), 1);
    }

    #[tokio::test]
    async fn test_cancelled_dispatch_still_counts() {
        let mut builder = builder();
        let id = builder
            .get("/slow", |_request: Request<Body>, _params: Params| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                "late"
            })
            .unwrap();
        let router = builder.build();

        let result = tokio::time::timeout(
            Duration::from_millis(20),
            router.handle(request(Method::GET, "/slow")),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(hits(&router, id), 1);
    }

    #[tokio::test]
    async fn test_concurrent_dispatch_counts_every_hit() {
        let mut builder = builder();
        let id = builder
            .get("/race/:n", |_request: Request<Body>, _params: Params| async {
                tokio::task::yield_now().await;
                "ok"
            })
            .unwrap();
        let router = builder.build();

        let tasks: Vec<_> = (0..64)
            .map(|n| {
                let router = router.clone();
                tokio::spawn(async move { router.handle(request(Method::GET, &format!("/race/{n}"))).await })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().status(), StatusCode::OK);
        }

        assert_eq!(hits(&router, id), 64);
    }

    #[tokio::test]
    async fn test_introspection_routes() {
        let mut builder = builder();
        builder.get("/a", ok).unwrap();
        builder.get("/b", ok).unwrap();
        let router = builder.build();

        router.handle(request(Method::GET, "/a")).await;

        let response = router.handle(request(Method::GET, "/endpoints")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let listing: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(listing.as_array().unwrap().len(), 2);
        assert_eq!(listing[0]["Path"], "/a");
        assert_eq!(listing[0]["Hits"], 1);

        let response = router.handle(request(Method::GET, "/endpoints/unhit")).await;
        let listing: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(listing.as_array().unwrap().len(), 1);
        assert_eq!(listing[0]["Path"], "/b");

        // Listing calls are dispatches too, but never show up.
        let paths: Vec<_> = router
            .endpoints(EndpointFilter::All)
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert!(!paths.iter().any(|p| p.starts_with("/endpoints")));
    }

    #[tokio::test]
    async fn test_introspection_disabled() {
        let mut config = RouterConfig::default();
        config.introspection.enabled = false;
        let router = RouterBuilder::new(config).unwrap().build();

        let response = router.handle(request(Method::GET, "/endpoints")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(router.registry().is_empty());
    }

    #[tokio::test]
    async fn test_introspection_path_clash_rejected() {
        let mut builder = builder();
        let err = builder.get("/endpoints", ok).unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { .. }));
        assert!(router_paths(builder.build()).is_empty());
    }

    fn router_paths(router: HitRouter) -> Vec<String> {
        router
            .endpoints(EndpointFilter::All)
            .into_iter()
            .map(|e| e.path)
            .collect()
    }

    #[tokio::test]
    async fn test_rejected_registration_records_nothing() {
        let mut builder = builder();
        builder.get("/users/:id", ok).unwrap();
        assert!(builder.get("/users/:name", ok).is_err());
        assert!(builder.get("/users/:id", ok).is_err());
        assert!(builder.get("no-slash", ok).is_err());

        assert_eq!(router_paths(builder.build()), vec!["/users/:id".to_string()]);
    }

    #[tokio::test]
    async fn test_shortcuts_register_each_method() {
        let mut builder = builder();
        builder.get("/m", ok).unwrap();
        builder.head("/m", ok).unwrap();
        builder.options("/m", ok).unwrap();
        builder.post("/m", ok).unwrap();
        builder.put("/m", ok).unwrap();
        builder.patch("/m", ok).unwrap();
        builder.delete("/m", ok).unwrap();
        let router = builder.build();

        let mut methods: Vec<_> = router
            .endpoints(EndpointFilter::All)
            .into_iter()
            .map(|e| e.method)
            .collect();
        methods.sort();
        assert_eq!(
            methods,
            vec!["DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT"]
        );
    }

    #[tokio::test]
    async fn test_serve_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css/site.css"), "body {}").unwrap();

        let mut builder = builder();
        let id = builder.serve_files("/static/*filepath", dir.path()).unwrap();
        let router = builder.build();

        let response = router.handle(request(Method::GET, "/static/css/site.css")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "body {}");

        std::fs::write(dir.path().join("read me.txt"), "spaced").unwrap();
        let response = router.handle(request(Method::GET, "/static/read%20me.txt")).await;
        assert_eq!(body_string(response).await, "spaced");

        let response = router.handle(request(Method::GET, "/static/missing.txt")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(hits(&router, id), 3);
    }

    #[tokio::test]
    async fn test_serve_files_requires_filepath() {
        let mut builder = builder();
        let err = builder.serve_files("/static/*path", ".").unwrap_err();
        assert!(matches!(err, RouteError::InvalidPattern { .. }));
    }

    #[tokio::test]
    async fn test_as_tower_service() {
        let mut builder = builder();
        let id = builder.get("/svc", ok).unwrap();
        let router = builder.build();

        let response = router.clone().oneshot(request(Method::GET, "/svc")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits(&router, id), 1);
    }
}
