//! Handler traits and type erasure.
//!
//! # How handlers are stored
//!
//! The router holds handlers of many different types in one table, so every
//! handler is erased behind [`ErasedHandler`] and shared as a
//! [`BoxedHandler`]. Middleware works on that erased form: it takes a
//! `BoxedHandler` and returns another one.
//!
//! ```text
//! async fn get_user(w: &mut ResponseWriter, req: &Request) -> Result<(), Error>
//!        ↓ router.handle_func("GET /users/{id}", get_user)
//! get_user.into_boxed_handler()              ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(get_user))              ← BoxedHandler
//!        ↓ wrapped by every middleware, first registered outermost
//! handler.call(&mut w, &req)  per request    ← one vtable dispatch per layer
//! ```
//!
//! Handlers borrow both the writer and the request. That is what lets the
//! router inspect the writer's `written` flag and hand the request to the
//! error hook after a handler has failed.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Error;
use crate::request::Request;
use crate::response::ResponseWriter;

// ── Erased types ──────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased handler future borrowing the writer and the
/// request for `'a`.
pub type BoxFuture<'a> = Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'a>>;

/// Dispatch interface shared by handlers and middleware-wrapped handlers.
///
/// Implement it directly for struct-based handlers and register them with
/// [`Router::handle`](crate::Router::handle).
pub trait ErasedHandler: Send + Sync + 'static {
    fn call<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a Request) -> BoxFuture<'a>;
}

/// A type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn ErasedHandler>;

// ── HandlerFn ─────────────────────────────────────────────────────────────────

/// An async function usable as a handler, for one borrow lifetime `'a`.
///
/// The bound `F: for<'a> HandlerFn<'a>` reads "an async fn whose future may
/// borrow its arguments". Satisfied by any
///
/// ```text
/// async fn name(w: &mut ResponseWriter, req: &Request) -> Result<(), Error>
/// ```
pub trait HandlerFn<'a>: Send + Sync + 'static {
    type Future: Future<Output = Result<(), Error>> + Send + 'a;

    fn invoke(&self, w: &'a mut ResponseWriter, req: &'a Request) -> Self::Future;
}

impl<'a, F, Fut> HandlerFn<'a> for F
where
    F: Fn(&'a mut ResponseWriter, &'a Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'a,
{
    type Future = Fut;

    fn invoke(&self, w: &'a mut ResponseWriter, req: &'a Request) -> Fut {
        self(w, req)
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every async fn that can be registered with
/// [`Router::handle_func`](crate::Router::handle_func).
///
/// Sealed: the blanket impl below is the only one.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F> private::Sealed for F where F: for<'a> HandlerFn<'a> + Send + Sync + 'static {}

impl<F> Handler for F
where
    F: for<'a> HandlerFn<'a> + Send + Sync + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Bridges a typed [`HandlerFn`] to the trait-object world.
struct FnHandler<F>(F);

impl<F> ErasedHandler for FnHandler<F>
where
    F: for<'a> HandlerFn<'a> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        Box::pin(self.0.invoke(w, req))
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::respond;

    async fn created(w: &mut ResponseWriter, _req: &Request) -> Result<(), Error> {
        respond::empty(w, StatusCode::CREATED)
    }

    async fn failing(_w: &mut ResponseWriter, _req: &Request) -> Result<(), Error> {
        Err(Error::other("nope"))
    }

    fn request() -> Request {
        let (parts, ()) = http::Request::new(()).into_parts();
        Request::new(parts, bytes::Bytes::new())
    }

    #[tokio::test]
    async fn async_fns_erase_into_boxed_handlers() {
        let handler = created.into_boxed_handler();
        let req = request();
        let mut w = ResponseWriter::new();

        handler.call(&mut w, &req).await.unwrap();
        assert_eq!(w.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn errors_pass_through_erasure() {
        let handler = failing.into_boxed_handler();
        let req = request();
        let mut w = ResponseWriter::new();

        let err = handler.call(&mut w, &req).await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
        assert!(!w.is_written());
    }
}
