//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use bodyrest::dispatch::BodyRest;
use bodyrest::http::{HandlerFunc, InboundRequest, ResponseWriter};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;

pub const BAD_REQUEST_TEXT: &str =
    "Error while parsing request. Please check your request and try again.";
pub const INTERNAL_ERROR_TEXT: &str = "Something went wrong. Please try again later.";

/// Payload mixing plain and optional fields, all required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payload {
    pub message: String,
    #[serde(rename = "messagePtr")]
    pub message_ptr: Option<String>,
    pub code: i64,
    #[serde(rename = "codePtr")]
    pub code_ptr: Option<i64>,
}

pub const VALID_PAYLOAD: &str =
    r#"{"message":"Hello", "code": 200, "messagePtr": "Hello", "codePtr": 200}"#;

#[derive(Serialize)]
struct ErrorAnswer<'a> {
    message: &'a str,
}

/// Registry with a JSON error renderer installed.
pub fn rest_with_renderer() -> BodyRest {
    with_renderer(BodyRest::default())
}

/// Install the JSON error renderer on `rest`.
pub fn with_renderer(rest: BodyRest) -> BodyRest {
    rest.set_error_renderer(
        |w: &mut ResponseWriter, _r: &InboundRequest, status: StatusCode| {
            w.write_status(status);
            let message = match status {
                StatusCode::BAD_REQUEST => BAD_REQUEST_TEXT,
                _ => INTERNAL_ERROR_TEXT,
            };
            let _ = w.write_json(&ErrorAnswer { message });
        },
    );
    rest
}

/// Handler answering 200 with an empty body.
pub fn ok_handler() -> HandlerFunc {
    HandlerFunc::new(|w, _| w.write_status(StatusCode::OK))
}

/// JSON body the renderer writes for `text`.
pub fn error_body(text: &str) -> String {
    format!(r#"{{"message":"{}"}}"#, text)
}

/// Send one request through `router` and collect status and body.
pub async fn send(router: Router, method: Method, uri: &str, body: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Send a multipart form with one file field named `field`.
pub async fn send_multipart(
    router: Router,
    uri: &str,
    field: &str,
    contents: &[u8],
) -> (StatusCode, String) {
    let mut body = format!(
        "--XBOUNDARY\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"upload.bin\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n",
        field
    )
    .into_bytes();
    body.extend_from_slice(contents);
    body.extend_from_slice(b"\r\n--XBOUNDARY--\r\n");

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
        .body(Body::from(body))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}
