//! Request handling and transformation.
//!
//! # Responsibilities
//! - Buffer the request body handed over by axum
//! - Capture the route pattern matched by the router
//! - Expose the request ID set by the request-id layer
//!
//! # Design Decisions
//! - The body is fully buffered before dispatch, up to a cap chosen by the
//!   dispatcher; a declared `Content-Length` over the cap is refused before
//!   reading, a streamed body as soon as it crosses the cap
//! - A request outside a router has no route pattern
//! - Path segments are read from the raw (still percent-encoded) URI path

use axum::{
    body::{Body, Bytes},
    extract::MatchedPath,
    http::{header, header::HeaderName, HeaderMap, HeaderValue, Method, Request, Uri},
};
use futures::StreamExt;
use thiserror::Error;

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Why a body could not be buffered.
#[derive(Debug, Error)]
pub enum BodyReadError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Transport(#[source] axum::Error),
}

/// A fully buffered inbound request as seen by the dispatcher.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    route_pattern: Option<String>,
    body: Option<Bytes>,
}

impl InboundRequest {
    /// Create a request without headers, body or route pattern.
    ///
    /// An unparsable `uri` falls back to `/`.
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.parse().unwrap_or_else(|_| Uri::from_static("/")),
            headers: HeaderMap::new(),
            route_pattern: None,
            body: None,
        }
    }

    /// Set the route pattern the router matched (e.g. `/users/{id}`).
    pub fn with_route_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.route_pattern = Some(pattern.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Split an axum request and buffer at most `limit` body bytes.
    ///
    /// When the body cannot be read the request is still returned, without
    /// a body, together with the read error.
    pub async fn from_http(request: Request<Body>, limit: usize) -> (Self, Option<BodyReadError>) {
        let (parts, body) = request.into_parts();
        let route_pattern = parts
            .extensions
            .get::<MatchedPath>()
            .map(|matched| matched.as_str().to_owned());

        let (body, error) = match read_body(&parts.headers, body, limit).await {
            Ok(bytes) => (Some(bytes), None),
            Err(e) => (None, Some(e)),
        };

        let request = Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            route_pattern,
            body,
        };
        (request, error)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The URL path, without the query string.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn route_pattern(&self) -> Option<&str> {
        self.route_pattern.as_deref()
    }

    /// The buffered body, `None` when the request carried none.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Number of body bytes received.
    pub fn content_length(&self) -> usize {
        self.body.as_ref().map(Bytes::len).unwrap_or(0)
    }

    pub fn request_id(&self) -> &str {
        self.headers
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

async fn read_body(headers: &HeaderMap, body: Body, limit: usize) -> Result<Bytes, BodyReadError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(BodyReadError::TooLarge { limit });
    }

    let mut buffer = Vec::with_capacity(declared.unwrap_or(0));
    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(BodyReadError::Transport)?;
        if buffer.len() + chunk.len() > limit {
            return Err(BodyReadError::TooLarge { limit });
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buffer))
}
