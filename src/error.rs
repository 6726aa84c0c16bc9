//! Unified error type.

use std::net::AddrParseError;

/// A boxed application error, as returned by database drivers, HTTP clients
/// and anything else a handler talks to.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by handlers, response helpers and the server.
///
/// Handlers return `Result<(), Error>`. How the router turns a failure into
/// a response depends on the variant:
///
/// - [`Error::NoRows`] becomes an empty `404 Not Found`.
/// - everything else goes to the router's error hook and, unless the hook
///   wrote a response itself, becomes a `500` whose body is the error message.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The persistence layer found no matching record.
    #[error("sql: no rows in result set")]
    NoRows,

    /// A body could not be serialized to (or parsed from) JSON.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// A template could not be found or rendered.
    #[error("template: {0}")]
    Template(#[from] minijinja::Error),

    /// A response was already written for this request.
    #[error("http: response already written")]
    AlreadyWritten,

    #[error("invalid socket address: {0}")]
    InvalidAddress(#[from] AddrParseError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Any other application error. Displays as the wrapped error.
    #[error(transparent)]
    Other(BoxError),
}

impl Error {
    /// Wrap an arbitrary application error.
    ///
    /// ```rust
    /// let err = httpx::Error::other(std::io::Error::other("disk on fire"));
    /// assert_eq!(err.to_string(), "disk on fire");
    /// ```
    pub fn other<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Other(err.into())
    }

    /// `true` for the "no matching record" sentinel.
    pub fn is_no_rows(&self) -> bool {
        match self {
            Self::NoRows => true,
            #[cfg(feature = "sqlx")]
            Self::Other(inner) => matches!(
                inner.downcast_ref::<sqlx::Error>(),
                Some(sqlx::Error::RowNotFound)
            ),
            _ => false,
        }
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NoRows,
            other => Self::Other(Box::new(other)),
        }
    }
}
