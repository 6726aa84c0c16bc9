//! # httpx
//!
//! Less boilerplate in HTTP handlers. Nothing more.
//!
//! Handlers write to a [`ResponseWriter`] and return `Result<(), Error>`.
//! The router takes it from there:
//!
//! - **JSON in one call** — [`respond::json`], [`respond::json_many`] (`[]`,
//!   never `null`, for an empty list)
//! - **"No rows" is a 404** — [`respond::json_from_query`] and the router both
//!   turn [`Error::NoRows`] into an empty `404 Not Found`
//! - **Every other error is a 500** — with the error message as the body,
//!   after a single call to the router's error hook ([`Router::on_error`])
//! - **Middleware chains** — [`Router::with`] for every route,
//!   [`Router::handle_func_with`] for one; the first registered runs first
//!
//! Serving is hyper's job (HTTP/1.1 and HTTP/2) and routing is matchit's.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use httpx::{Error, Request, ResponseWriter, Router, Server, middleware, respond};
//!
//! #[derive(serde::Serialize)]
//! struct User { id: u64, name: String }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let app = Router::new()
//!         .with(middleware::trace())
//!         .handle_func("GET /users/{id}", get_user)
//!         .handle_func("GET /users",      list_users);
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn get_user(w: &mut ResponseWriter, req: &Request) -> Result<(), Error> {
//!     let id: u64 = req.param("id").and_then(|id| id.parse().ok()).ok_or(Error::NoRows)?;
//!     respond::json_from_query(w, find_user(id).await, StatusCode::OK)
//! }
//!
//! async fn list_users(w: &mut ResponseWriter, _req: &Request) -> Result<(), Error> {
//!     respond::json_many::<User>(w, &[], StatusCode::OK)
//! }
//!
//! # async fn find_user(_: u64) -> Result<User, Error> { Err(Error::NoRows) }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;
pub mod respond;

pub use error::{BoxError, Error};
pub use handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler, HandlerFn};
pub use middleware::{Middleware, Next};
pub use request::Request;
pub use response::{ContentType, ResponseWriter};
pub use router::{ErrorHook, Router, log_and_500};
pub use server::Server;
