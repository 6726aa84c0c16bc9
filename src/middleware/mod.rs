//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: structured tracing, request-id injection,
//! authentication-header inspection.
//!
//! A [`Middleware`] is a decorator: it takes the [`BoxedHandler`] it wraps and
//! returns a new one. The router applies the decorators when a handler is
//! registered, never per request.
//!
//! # Ordering
//!
//! The first middleware registered is the outermost one. Router-wide
//! middleware wraps per-route middleware:
//!
//! ```text
//! Router::new().with(a).with(b).handle_func_with("/x", h, [c])
//!
//! request → a → b → c → h
//! ```
//!
//! # Writing middleware
//!
//! ```rust
//! use httpx::middleware::{self, Next};
//! use httpx::{Error, Request, ResponseWriter, Router};
//! use http::StatusCode;
//!
//! async fn require_token(w: &mut ResponseWriter, req: &Request, next: Next) -> Result<(), Error> {
//!     if req.header("authorization").is_none() {
//!         return httpx::respond::empty(w, StatusCode::UNAUTHORIZED);
//!     }
//!     next.run(w, req).await
//! }
//!
//! let app = Router::new().with(middleware::from_fn(require_token));
//! ```

mod trace;

use std::future::Future;
use std::sync::Arc;

use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::response::ResponseWriter;

pub use trace::trace;

/// A handler decorator.
#[derive(Clone)]
pub struct Middleware(Arc<dyn Fn(BoxedHandler) -> BoxedHandler + Send + Sync>);

impl Middleware {
    /// Middleware from a raw `BoxedHandler -> BoxedHandler` transformation.
    pub fn new<F>(wrap: F) -> Self
    where
        F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
    {
        Self(Arc::new(wrap))
    }

    pub(crate) fn apply(&self, inner: BoxedHandler) -> BoxedHandler {
        (self.0)(inner)
    }
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Middleware").finish_non_exhaustive()
    }
}

/// Wraps `handler` in `chain`, first element outermost.
pub(crate) fn wrap<'m, I>(handler: BoxedHandler, chain: I) -> BoxedHandler
where
    I: IntoIterator<Item = &'m Middleware>,
    I::IntoIter: DoubleEndedIterator,
{
    chain.into_iter().rev().fold(handler, |inner, mw| mw.apply(inner))
}

// ── Next ──────────────────────────────────────────────────────────────────────

/// The rest of the chain, as seen from inside a middleware.
pub struct Next {
    inner: BoxedHandler,
}

impl Next {
    /// Runs the wrapped handler (and every middleware inside this one).
    pub fn run<'a>(self, w: &'a mut ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        let inner = self.inner;
        Box::pin(async move { inner.call(w, req).await })
    }
}

// ── from_fn ───────────────────────────────────────────────────────────────────

/// An async function usable as middleware, for one borrow lifetime `'a`.
///
/// Satisfied by any
///
/// ```text
/// async fn name(w: &mut ResponseWriter, req: &Request, next: Next) -> Result<(), Error>
/// ```
pub trait MiddlewareFn<'a>: Send + Sync + 'static {
    type Future: Future<Output = Result<(), Error>> + Send + 'a;

    fn invoke(&self, w: &'a mut ResponseWriter, req: &'a Request, next: Next) -> Self::Future;
}

impl<'a, F, Fut> MiddlewareFn<'a> for F
where
    F: Fn(&'a mut ResponseWriter, &'a Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'a,
{
    type Future = Fut;

    fn invoke(&self, w: &'a mut ResponseWriter, req: &'a Request, next: Next) -> Fut {
        self(w, req, next)
    }
}

/// Middleware from an async fn taking the writer, the request and [`Next`].
pub fn from_fn<F>(f: F) -> Middleware
where
    F: for<'a> MiddlewareFn<'a> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Middleware::new(move |inner| {
        Arc::new(FromFn { f: Arc::clone(&f), inner }) as BoxedHandler
    })
}

struct FromFn<F> {
    f: Arc<F>,
    inner: BoxedHandler,
}

impl<F> ErasedHandler for FromFn<F>
where
    F: for<'a> MiddlewareFn<'a> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        let next = Next { inner: Arc::clone(&self.inner) };
        Box::pin(self.f.invoke(w, req, next))
    }
}
