//! Response helpers.
//!
//! Each helper writes exactly one response to the [`ResponseWriter`] or fails
//! before writing anything. Values are serialized before the status line goes
//! out, so a serialization error still leaves room for the router's `500`.
//!
//! ```rust,no_run
//! use httpx::{Error, Request, ResponseWriter, respond};
//! use http::StatusCode;
//!
//! # #[derive(serde::Serialize)] struct User { id: u64 }
//! # async fn find_user(_: &str) -> Result<User, Error> { Err(Error::NoRows) }
//! async fn get_user(w: &mut ResponseWriter, req: &Request) -> Result<(), Error> {
//!     let id = req.param("id").unwrap_or_default();
//!     // 200 with the user, empty 404 when the query matched nothing.
//!     respond::json_from_query(w, find_user(id).await, StatusCode::OK)
//! }
//! ```

use http::header::{HeaderValue, X_CONTENT_TYPE_OPTIONS};
use http::StatusCode;
use minijinja::Environment;
use serde::Serialize;

use crate::error::Error;
use crate::response::{ContentType, ResponseWriter};

/// Writes `value` as JSON with the given status.
pub fn json<T>(w: &mut ResponseWriter, value: &T, code: StatusCode) -> Result<(), Error>
where
    T: Serialize + ?Sized,
{
    let body = serde_json::to_vec(value)?;
    w.send(code, Some(ContentType::Json), &body)
}

/// Writes a JSON array. An empty slice is always the literal `[]`.
pub fn json_many<T>(w: &mut ResponseWriter, values: &[T], code: StatusCode) -> Result<(), Error>
where
    T: Serialize,
{
    if values.is_empty() {
        return w.send(code, Some(ContentType::Json), b"[]");
    }
    json(w, values, code)
}

/// Writes the outcome of a single-row query.
///
/// `Ok` is written as [`json`]. The "no rows" sentinel becomes an empty
/// `404`. Any other error is handed back untouched for the router to report.
pub fn json_from_query<T, E>(
    w: &mut ResponseWriter,
    result: Result<T, E>,
    code: StatusCode,
) -> Result<(), Error>
where
    T: Serialize,
    E: Into<Error>,
{
    match result.map_err(Into::into) {
        Ok(value) => json(w, &value, code),
        Err(err) if err.is_no_rows() => empty(w, StatusCode::NOT_FOUND),
        Err(err) => Err(err),
    }
}

/// [`json_from_query`] for multi-row queries, written as [`json_many`].
pub fn json_many_from_query<T, E>(
    w: &mut ResponseWriter,
    result: Result<Vec<T>, E>,
    code: StatusCode,
) -> Result<(), Error>
where
    T: Serialize,
    E: Into<Error>,
{
    match result.map_err(Into::into) {
        Ok(values) => json_many(w, &values, code),
        Err(err) if err.is_no_rows() => empty(w, StatusCode::NOT_FOUND),
        Err(err) => Err(err),
    }
}

/// Writes a literal HTML body.
pub fn html(w: &mut ResponseWriter, body: &str, code: StatusCode) -> Result<(), Error> {
    w.send(code, Some(ContentType::Html), body.as_bytes())
}

/// Renders the template `name` from `env` with `ctx` and writes it as HTML.
pub fn html_template<S>(
    w: &mut ResponseWriter,
    env: &Environment<'_>,
    name: &str,
    ctx: S,
    code: StatusCode,
) -> Result<(), Error>
where
    S: Serialize,
{
    let body = env.get_template(name)?.render(ctx)?;
    html(w, &body, code)
}

/// Writes the error's message as a plain-text body.
pub fn error<E>(w: &mut ResponseWriter, err: &E, code: StatusCode) -> Result<(), Error>
where
    E: std::fmt::Display + ?Sized,
{
    if !w.is_written() {
        w.headers_mut()
            .insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    }
    w.send(code, Some(ContentType::Text), err.to_string().as_bytes())
}

/// Writes only a status line.
pub fn empty(w: &mut ResponseWriter, code: StatusCode) -> Result<(), Error> {
    w.send(code, None, &[])
}

/// `204 No Content`.
pub fn no_content(w: &mut ResponseWriter) -> Result<(), Error> {
    empty(w, StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use http::header::CONTENT_TYPE;
    use minijinja::context;
    use serde::ser::Error as _;

    use super::*;

    #[derive(Serialize)]
    struct User {
        id: u64,
        name: &'static str,
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("refusing to serialize"))
        }
    }

    #[test]
    fn json_sets_type_status_and_body() {
        let mut w = ResponseWriter::new();
        json(&mut w, &User { id: 1, name: "alice" }, StatusCode::CREATED).unwrap();

        assert_eq!(w.status(), StatusCode::CREATED);
        assert_eq!(w.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(w.body(), br#"{"id":1,"name":"alice"}"#);
    }

    #[test]
    fn json_failure_writes_nothing() {
        let mut w = ResponseWriter::new();
        let err = json(&mut w, &Unserializable, StatusCode::OK).unwrap_err();

        assert!(matches!(err, Error::Json(_)));
        assert!(!w.is_written());
        assert!(w.headers().is_empty());
    }

    #[test]
    fn json_many_of_nothing_is_an_empty_array() {
        let mut w = ResponseWriter::new();
        json_many::<User>(&mut w, &[], StatusCode::OK).unwrap();

        assert_eq!(w.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(w.body(), b"[]");
    }

    #[test]
    fn json_many_writes_every_element() {
        let mut w = ResponseWriter::new();
        let users = [User { id: 1, name: "a" }, User { id: 2, name: "b" }];
        json_many(&mut w, &users, StatusCode::OK).unwrap();

        assert_eq!(w.body(), br#"[{"id":1,"name":"a"},{"id":2,"name":"b"}]"#);
    }

    #[test]
    fn query_without_rows_is_an_empty_404() {
        let mut w = ResponseWriter::new();
        json_from_query::<User, _>(&mut w, Err(Error::NoRows), StatusCode::OK).unwrap();

        assert_eq!(w.status(), StatusCode::NOT_FOUND);
        assert!(w.body().is_empty());
        assert!(w.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn query_failure_is_handed_back() {
        let mut w = ResponseWriter::new();
        let err = json_many_from_query::<User, _>(
            &mut w,
            Err(Error::other("connection reset")),
            StatusCode::OK,
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "connection reset");
        assert!(!w.is_written());
    }

    #[test]
    fn query_rows_are_written_as_json() {
        let mut w = ResponseWriter::new();
        let rows: Result<Vec<User>, Error> = Ok(vec![]);
        json_many_from_query(&mut w, rows, StatusCode::OK).unwrap();

        assert_eq!(w.status(), StatusCode::OK);
        assert_eq!(w.body(), b"[]");
    }

    #[test]
    fn html_and_templates() {
        let mut env = Environment::new();
        env.add_template("hello.html", "<h1>Hello {{ name }}</h1>").unwrap();

        let mut w = ResponseWriter::new();
        html_template(&mut w, &env, "hello.html", context! { name => "alice" }, StatusCode::OK)
            .unwrap();
        assert_eq!(w.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(w.body(), b"<h1>Hello alice</h1>");

        let mut w = ResponseWriter::new();
        let err = html_template(&mut w, &env, "missing.html", (), StatusCode::OK).unwrap_err();
        assert!(matches!(err, Error::Template(_)));
        assert!(!w.is_written());
    }

    #[test]
    fn html_templates_escape_their_context() {
        let mut env = Environment::new();
        env.add_template("hello.html", "<h1>Hello {{ name }}</h1>").unwrap();

        let mut w = ResponseWriter::new();
        let name = "<script>alert(1)</script>";
        html_template(&mut w, &env, "hello.html", context! { name }, StatusCode::OK).unwrap();
        let body = std::str::from_utf8(w.body()).unwrap();
        assert!(body.starts_with("<h1>Hello &lt;script&gt;alert(1)"), "{body}");
        assert!(!body.contains("<script>"), "{body}");
    }

    #[test]
    fn error_writes_the_message_as_text() {
        let mut w = ResponseWriter::new();
        error(&mut w, &Error::other("boom"), StatusCode::BAD_GATEWAY).unwrap();

        assert_eq!(w.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(w.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(w.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(w.body(), b"boom");
    }

    #[test]
    fn second_helper_call_is_rejected() {
        let mut w = ResponseWriter::new();
        html(&mut w, "<p>first</p>", StatusCode::OK).unwrap();

        let err = error(&mut w, "second", StatusCode::INTERNAL_SERVER_ERROR).unwrap_err();
        assert!(matches!(err, Error::AlreadyWritten));
        assert_eq!(w.status(), StatusCode::OK);
        assert_eq!(w.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        assert!(w.headers().get(X_CONTENT_TYPE_OPTIONS).is_none());
        assert_eq!(w.body(), b"<p>first</p>");
    }

    #[test]
    fn no_content_is_status_only() {
        let mut w = ResponseWriter::new();
        no_content(&mut w).unwrap();
        assert_eq!(w.status(), StatusCode::NO_CONTENT);
        assert!(w.body().is_empty());
    }
}
