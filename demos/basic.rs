//! Minimal httpx example — CRUD-style JSON endpoints over an in-memory table.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/users
//!   curl -i http://localhost:3000/users/1
//!   curl -i http://localhost:3000/users/42          # 404, no such row
//!   curl -i -X POST http://localhost:3000/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl -i http://localhost:3000/hello/bob

use std::sync::Mutex;

use http::StatusCode;
use httpx::middleware::{self, Next};
use httpx::{Error, Request, ResponseWriter, Router, Server, respond};
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize)]
struct User {
    id: u64,
    name: String,
}

#[derive(Deserialize)]
struct NewUser {
    name: String,
}

static USERS: Mutex<Vec<User>> = Mutex::new(Vec::new());

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let app = Router::new()
        .with(middleware::trace())
        .with(middleware::from_fn(powered_by))
        .handle_func("GET /users",      list_users)
        .handle_func("GET /users/{id}", get_user)
        .handle_func("POST /users",     create_user)
        .handle_func("GET /hello/{name}", hello);

    Server::bind("0.0.0.0:3000")?.serve(app).await
}

async fn powered_by(w: &mut ResponseWriter, req: &Request, next: Next) -> Result<(), Error> {
    w.headers_mut().insert("x-powered-by", http::HeaderValue::from_static("httpx"));
    next.run(w, req).await
}

// A stand-in for a database query: `NoRows` when nothing matches.
fn find_user(id: &str) -> Result<User, Error> {
    let id: u64 = id.parse().map_err(|_| Error::NoRows)?;
    let users = USERS.lock().map_err(|e| Error::other(e.to_string()))?;
    users.iter().find(|u| u.id == id).cloned().ok_or(Error::NoRows)
}

// GET /users → [] when empty, never null
async fn list_users(w: &mut ResponseWriter, _req: &Request) -> Result<(), Error> {
    let users = USERS.lock().map_err(|e| Error::other(e.to_string()))?.clone();
    respond::json_many(w, &users, StatusCode::OK)
}

// GET /users/{id} → 200 with the user, empty 404 when the row is missing
async fn get_user(w: &mut ResponseWriter, req: &Request) -> Result<(), Error> {
    let id = req.param("id").unwrap_or_default();
    respond::json_from_query(w, find_user(id), StatusCode::OK)
}

// POST /users → 201; malformed JSON surfaces as a 500 through the error hook
async fn create_user(w: &mut ResponseWriter, req: &Request) -> Result<(), Error> {
    let input: NewUser = req.json()?;
    let user = {
        let mut users = USERS.lock().map_err(|e| Error::other(e.to_string()))?;
        let user = User { id: users.len() as u64 + 1, name: input.name };
        users.push(user.clone());
        user
    };
    respond::json(w, &user, StatusCode::CREATED)
}

// GET /hello/{name} → rendered HTML; the `.html` name turns on autoescaping
async fn hello(w: &mut ResponseWriter, req: &Request) -> Result<(), Error> {
    let mut env = Environment::new();
    env.add_template("hello.html", "<h1>Hello, {{ name }}!</h1>")?;
    let name = req.param("name").unwrap_or("world");
    respond::html_template(w, &env, "hello.html", context! { name => name }, StatusCode::OK)
}
