//! Response writing.
//!
//! # Responsibilities
//! - Collect status, headers and body written by a request handler
//! - Convert the collected response into an axum `Response`
//! - Define the `ServeHttp` capability returned by target handlers
//!
//! # Design Decisions
//! - The first status written wins; later writes are ignored
//! - Writing body bytes without a status implies 200 OK
//! - Nothing is flushed until the dispatcher hands the writer back to axum

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use serde::Serialize;

use crate::http::request::InboundRequest;

/// Buffered response sink handed to request handlers.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status code. Only the first call has an effect.
    pub fn write_status(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    /// Mutable access to the response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Append bytes to the body.
    pub fn write(&mut self, bytes: &[u8]) {
        self.write_status(StatusCode::OK);
        self.body.extend_from_slice(bytes);
    }

    /// Serialize `value` as JSON into the body and set the content type.
    pub fn write_json<T: Serialize>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        let encoded = serde_json::to_vec(value)?;
        self.headers
            .entry(header::CONTENT_TYPE)
            .or_insert(HeaderValue::from_static("application/json"));
        self.write(&encoded);
        Ok(())
    }

    /// Status written so far, or 200 if nothing was written.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Convert into an axum response.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(Bytes::from(self.body)));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

/// The response-writing stage of a dispatch.
///
/// A target handler resolves its inputs and returns something that serves
/// the exchange. It receives the live writer and the unmodified request.
pub trait ServeHttp: Send {
    fn serve(self: Box<Self>, writer: &mut ResponseWriter, request: &InboundRequest);
}

impl<F> ServeHttp for F
where
    F: FnOnce(&mut ResponseWriter, &InboundRequest) + Send,
{
    fn serve(self: Box<Self>, writer: &mut ResponseWriter, request: &InboundRequest) {
        (*self)(writer, request)
    }
}

/// A boxed request-handling callback, the only valid return value of a
/// target handler.
pub struct HandlerFunc(Box<dyn ServeHttp>);

impl HandlerFunc {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&mut ResponseWriter, &InboundRequest) + Send + 'static,
    {
        Self(Box::new(f))
    }

    /// Wrap any `ServeHttp` implementation.
    pub fn from_serve(serve: impl ServeHttp + 'static) -> Self {
        Self(Box::new(serve))
    }

    /// Serve the exchange.
    pub fn serve_http(self, writer: &mut ResponseWriter, request: &InboundRequest) {
        self.0.serve(writer, request)
    }
}

impl std::fmt::Debug for HandlerFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HandlerFunc")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    #[test]
    fn test_first_status_wins() {
        let mut writer = ResponseWriter::new();
        writer.write_status(StatusCode::CREATED);
        writer.write_status(StatusCode::BAD_REQUEST);
        assert_eq!(writer.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_write_implies_ok() {
        let mut writer = ResponseWriter::new();
        writer.write(b"hello");
        assert_eq!(writer.status(), StatusCode::OK);
        assert_eq!(writer.body(), b"hello");
    }

    #[test]
    fn test_write_json_sets_content_type() {
        let mut writer = ResponseWriter::new();
        writer.write_status(StatusCode::ACCEPTED);
        writer.write_json(&serde_json::json!({"ok": true})).unwrap();

        assert_eq!(writer.status(), StatusCode::ACCEPTED);
        assert_eq!(
            writer.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(writer.body(), br#"{"ok":true}"#);
    }

    #[test]
    fn test_handler_func_serves() {
        let request = InboundRequest::new(Method::GET, "/ping");
        let mut writer = ResponseWriter::new();
        let handler = HandlerFunc::new(|w, r| {
            w.write_status(StatusCode::IM_A_TEAPOT);
            w.write(r.path().as_bytes());
        });
        handler.serve_http(&mut writer, &request);

        let response = writer.into_response();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }
}
