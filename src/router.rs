//! Request router with a middleware chain and an error hook.
//!
//! Patterns are `"[METHOD ]/path"`. A pattern with a method only matches that
//! method (`GET` also answers `HEAD`); a bare path matches every method. Path
//! syntax is matchit's: `{name}` captures one segment, `{*rest}` the tail.
//!
//! Middleware is applied when a handler is registered, so [`Router::with`]
//! must come before the routes it should cover.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{ALLOW, HeaderValue};
use http::{Method, StatusCode};
use http_body_util::Full;
use matchit::Router as MatchitRouter;
use tracing::{debug, error};

use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::middleware::{self, Middleware};
use crate::request::Request;
use crate::respond;
use crate::response::ResponseWriter;

/// Called once for every handler failure other than the "no rows" sentinel.
///
/// If the hook leaves the writer unwritten, the router follows up with a
/// `500` carrying the error message.
pub type ErrorHook = Arc<dyn Fn(&mut ResponseWriter, &Request, &Error) + Send + Sync>;

/// The default [`ErrorHook`]: logs the failure and answers `500` with the
/// error message as plain text.
pub fn log_and_500(w: &mut ResponseWriter, req: &Request, err: &Error) {
    error!(method = %req.method(), path = %req.path(), error = %err, "handler failed");
    if !w.is_written() {
        let _ = respond::error(w, err, StatusCode::INTERNAL_SERVER_ERROR);
    }
}

/// The application router.
///
/// One radix tree per method, plus one for method-less patterns. Build it once
/// at startup and pass it to [`Server::serve`](crate::Server::serve), or drive
/// it directly with [`Router::call`].
///
/// ```rust
/// use httpx::{Error, Request, ResponseWriter, Router, middleware, respond};
/// use http::StatusCode;
///
/// async fn list_users(w: &mut ResponseWriter, _req: &Request) -> Result<(), Error> {
///     respond::json_many::<String>(w, &[], StatusCode::OK)
/// }
///
/// let app = Router::new()
///     .with(middleware::trace())
///     .on_error(|w, req, err| {
///         tracing::warn!(path = %req.path(), %err, "request failed");
///         let _ = respond::json(w, &err.to_string(), StatusCode::INTERNAL_SERVER_ERROR);
///     })
///     .handle_func("GET /users", list_users);
/// ```
pub struct Router {
    routes: HashMap<Option<Method>, MatchitRouter<BoxedHandler>>,
    middleware: Vec<Middleware>,
    on_error: ErrorHook,
}

enum Route {
    Found(BoxedHandler, HashMap<String, String>),
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            middleware: Vec::new(),
            on_error: Arc::new(log_and_500),
        }
    }

    /// Appends `mw` to the router-wide chain.
    pub fn with(mut self, mw: Middleware) -> Self {
        self.middleware.push(mw);
        self
    }

    /// Appends every middleware in `mws`, in order. Empty is a no-op.
    pub fn with_all(mut self, mws: impl IntoIterator<Item = Middleware>) -> Self {
        self.middleware.extend(mws);
        self
    }

    /// Replaces the error hook (default: [`log_and_500`]).
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ResponseWriter, &Request, &Error) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(hook);
        self
    }

    /// Registers an already-erased handler.
    pub fn handle(self, pattern: &str, handler: BoxedHandler) -> Self {
        self.add(pattern, handler, Vec::new())
    }

    /// [`handle`](Self::handle) with extra middleware for this route only.
    pub fn handle_with(
        self,
        pattern: &str,
        handler: BoxedHandler,
        mws: impl IntoIterator<Item = Middleware>,
    ) -> Self {
        self.add(pattern, handler, mws.into_iter().collect())
    }

    /// Registers an async fn handler.
    ///
    /// ```rust
    /// # use httpx::{Error, Request, ResponseWriter, Router, respond};
    /// # use http::StatusCode;
    /// # async fn get_user(w: &mut ResponseWriter, _: &Request) -> Result<(), Error> { respond::no_content(w) }
    /// # async fn create_user(w: &mut ResponseWriter, _: &Request) -> Result<(), Error> { respond::no_content(w) }
    /// Router::new()
    ///     .handle_func("GET /users/{id}", get_user)
    ///     .handle_func("POST /users",     create_user);
    /// ```
    pub fn handle_func(self, pattern: &str, handler: impl Handler) -> Self {
        self.add(pattern, handler.into_boxed_handler(), Vec::new())
    }

    /// [`handle_func`](Self::handle_func) with extra middleware for this
    /// route only. It runs inside the router-wide chain.
    pub fn handle_func_with(
        self,
        pattern: &str,
        handler: impl Handler,
        mws: impl IntoIterator<Item = Middleware>,
    ) -> Self {
        self.add(pattern, handler.into_boxed_handler(), mws.into_iter().collect())
    }

    fn add(mut self, pattern: &str, handler: BoxedHandler, route_mws: Vec<Middleware>) -> Self {
        let (method, path) = parse_pattern(pattern);
        let chain = self.middleware.iter().chain(route_mws.iter()).collect::<Vec<_>>();
        let handler = middleware::wrap(Arc::new(Resolve(handler)), chain);

        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler)
            .unwrap_or_else(|e| panic!("invalid route `{pattern}`: {e}"));
        self
    }

    fn lookup(&self, method: &Method, path: &str) -> Route {
        let found = |tree: Option<&MatchitRouter<BoxedHandler>>| {
            let matched = tree?.at(path).ok()?;
            let params = matched.params.iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            Some(Route::Found(Arc::clone(matched.value), params))
        };

        if let Some(route) = found(self.routes.get(&Some(method.clone()))) {
            return route;
        }
        if *method == Method::HEAD {
            if let Some(route) = found(self.routes.get(&Some(Method::GET))) {
                return route;
            }
        }
        if let Some(route) = found(self.routes.get(&None)) {
            return route;
        }

        let mut allowed: Vec<Method> = self.routes.iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .filter_map(|(m, _)| m.clone())
            .collect();
        if allowed.is_empty() {
            return Route::NotFound;
        }
        if allowed.contains(&Method::GET) && !allowed.contains(&Method::HEAD) {
            allowed.push(Method::HEAD);
        }
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Route::MethodNotAllowed(allowed)
    }

    /// Routes and runs one request, returning the finished response.
    ///
    /// Unmatched paths get an empty `404`; paths registered only under other
    /// methods get `405` with an `allow` header.
    pub async fn call(&self, req: http::Request<Bytes>) -> http::Response<Full<Bytes>> {
        let (parts, body) = req.into_parts();
        let mut req = Request::new(parts, body);
        let mut w = ResponseWriter::new();

        match self.lookup(req.method(), req.path()) {
            Route::Found(handler, params) => {
                req.params = params;
                req.on_error = Some(Arc::clone(&self.on_error));
                if let Err(err) = handler.call(&mut w, &req).await {
                    // Failures raised by middleware outside the handler.
                    if !w.reported {
                        resolve(&mut w, &req, &err);
                    }
                }
            }
            Route::MethodNotAllowed(allowed) => {
                let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    w.headers_mut().insert(ALLOW, value);
                }
                let _ = respond::empty(&mut w, StatusCode::METHOD_NOT_ALLOWED);
            }
            Route::NotFound => {
                let _ = respond::empty(&mut w, StatusCode::NOT_FOUND);
            }
        }

        w.into_response()
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

// ── Error resolution ──────────────────────────────────────────────────────────

/// Innermost layer of every route: turns the handler's error into a response
/// before any middleware sees the outcome, then passes the error on.
struct Resolve(BoxedHandler);

impl ErasedHandler for Resolve {
    fn call<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        Box::pin(async move {
            let result = self.0.call(w, req).await;
            if let Err(err) = &result {
                resolve(w, req, err);
            }
            result
        })
    }
}

/// Writes the response for a failed request.
///
/// The "no rows" sentinel becomes an empty `404` unless something was already
/// written. Any other error goes to the error hook once; if the hook writes
/// nothing, a `500` with the error message follows.
fn resolve(w: &mut ResponseWriter, req: &Request, err: &Error) {
    if err.is_no_rows() {
        debug!(path = %req.path(), "no matching record");
        if !w.is_written() {
            let _ = respond::empty(w, StatusCode::NOT_FOUND);
        }
        return;
    }
    if w.reported {
        return;
    }
    w.reported = true;

    match &req.on_error {
        Some(hook) => hook(&mut *w, req, err),
        None => log_and_500(w, req, err),
    }
    if !w.is_written() {
        let _ = respond::error(w, err, StatusCode::INTERNAL_SERVER_ERROR);
    }
}

/// Splits `"GET /users"` into `(Some(GET), "/users")`; a bare path has no method.
fn parse_pattern(pattern: &str) -> (Option<Method>, &str) {
    let pattern = pattern.trim();
    match pattern.split_once(' ') {
        Some((method, path)) if !method.starts_with('/') => {
            let method = Method::from_bytes(method.as_bytes())
                .unwrap_or_else(|e| panic!("invalid method in route `{pattern}`: {e}"));
            (Some(method), path.trim_start())
        }
        _ => (None, pattern),
    }
}
