//! The per-request response sink.
//!
//! A [`ResponseWriter`] is created by the router for every request and
//! borrowed mutably by the handler chain. It accepts exactly one status line:
//! the first [`write_header`](ResponseWriter::write_header) (explicit, or
//! implied by the first [`write`](ResponseWriter::write)) flips the `written`
//! flag, and every later attempt fails with [`Error::AlreadyWritten`] without
//! touching what was already sent.

use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use tracing::warn;

use crate::error::Error;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content types produced by the response helpers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Html, // text/html; charset=utf-8
    Json, // application/json
    Text, // text/plain; charset=utf-8
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "text/html; charset=utf-8",
            Self::Json => "application/json",
            Self::Text => "text/plain; charset=utf-8",
        }
    }

    pub(crate) fn header_value(self) -> HeaderValue {
        HeaderValue::from_static(self.as_str())
    }
}

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// Where a handler writes status, headers and body for one request.
///
/// Headers set through [`headers_mut`](Self::headers_mut) are sent with the
/// status line. Once the status is written the header set is frozen: later
/// mutations land in a fresh map that is discarded.
#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    sent_headers: Option<HeaderMap>,
    body: BytesMut,
    // Set by `send`: the body is complete and takes no more bytes.
    complete: bool,
    // Set once the error hook has seen this request's failure.
    pub(crate) reported: bool,
}

impl ResponseWriter {
    pub(crate) fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            sent_headers: None,
            body: BytesMut::new(),
            complete: false,
            reported: false,
        }
    }

    /// Headers that will be sent with the status line.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The headers as they stand: the sent set once written, the pending
    /// set before.
    pub fn headers(&self) -> &HeaderMap {
        self.sent_headers.as_ref().unwrap_or(&self.headers)
    }

    /// Whether a status has been written yet.
    pub fn is_written(&self) -> bool {
        self.sent_headers.is_some()
    }

    /// The written status, `200 OK` until something is written.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Writes the status line and freezes the headers.
    pub fn write_header(&mut self, status: StatusCode) -> Result<(), Error> {
        if self.is_written() {
            warn!(
                attempted = status.as_u16(),
                sent = self.status.as_u16(),
                "superfluous write_header call"
            );
            return Err(Error::AlreadyWritten);
        }
        self.status = status;
        self.sent_headers = Some(std::mem::take(&mut self.headers));
        Ok(())
    }

    /// Appends to the body, writing `200 OK` first if no status was written.
    ///
    /// Fails once a response helper has written a complete response.
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), Error> {
        if self.complete {
            warn!(
                sent = self.status.as_u16(),
                len = chunk.len(),
                "response already complete, dropping body chunk"
            );
            return Err(Error::AlreadyWritten);
        }
        if !self.is_written() {
            self.write_header(StatusCode::OK)?;
        }
        self.body.extend_from_slice(chunk);
        Ok(())
    }

    /// Writes a complete response in one step: content type, status, body.
    ///
    /// Fails without side effects if a status was already written.
    pub(crate) fn send(
        &mut self,
        status: StatusCode,
        content_type: Option<ContentType>,
        body: &[u8],
    ) -> Result<(), Error> {
        if self.is_written() {
            warn!(
                attempted = status.as_u16(),
                sent = self.status.as_u16(),
                "response already written, dropping second response"
            );
            return Err(Error::AlreadyWritten);
        }
        if let Some(content_type) = content_type {
            self.headers.insert(CONTENT_TYPE, content_type.header_value());
        }
        self.write_header(status)?;
        self.body.extend_from_slice(body);
        self.complete = true;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn body(&self) -> &[u8] {
        &self.body
    }

    pub(crate) fn into_response(self) -> http::Response<Full<Bytes>> {
        let headers = self.sent_headers.unwrap_or(self.headers);
        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        response
    }
}
