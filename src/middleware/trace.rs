//! Per-request tracing.

use std::time::Instant;

use tracing::{Instrument, info, info_span};

use super::{Middleware, Next, from_fn};
use crate::error::Error;
use crate::request::Request;
use crate::response::ResponseWriter;

/// A `request` span carrying method and path around everything inside it,
/// closed by one `info` event with status and latency.
///
/// Handler errors are turned into a response before any middleware resumes,
/// so the status logged here is the one the client gets, and the error hook
/// runs inside the span. Register it first so it covers the whole chain:
///
/// ```rust
/// use httpx::{Router, middleware};
///
/// let app = Router::new().with(middleware::trace());
/// ```
pub fn trace() -> Middleware {
    from_fn(trace_request)
}

async fn trace_request(w: &mut ResponseWriter, req: &Request, next: Next) -> Result<(), Error> {
    let span = info_span!("request", method = %req.method(), path = %req.path());
    let started = Instant::now();

    let result = next.run(w, req).instrument(span.clone()).await;

    span.in_scope(|| {
        info!(
            status = w.status().as_u16(),
            failed = result.is_err(),
            latency = ?started.elapsed(),
            "request completed"
        );
    });
    result
}
