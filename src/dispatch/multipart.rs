//! Multipart form decoding.
//!
//! `MultipartForm` is the one composite parameter type decoded as
//! `multipart/form-data` instead of JSON. The body is already buffered, so
//! the multer stream is driven to completion on the calling thread.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::body::Bytes;
use axum::http::{header, HeaderMap};
use futures::{executor::block_on, future, stream};
use multer::{Constraints, Multipart, SizeLimit};

/// Default upper bound on the bytes a multipart body may occupy.
pub const DEFAULT_MAX_MULTIPART_BYTES: usize = 32 << 20;

/// An uploaded file part.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// A parsed multipart form: text fields and file parts, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartForm {
    pub values: HashMap<String, Vec<String>>,
    pub files: HashMap<String, Vec<FilePart>>,
}

impl MultipartForm {
    /// First value of a text field.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// First file uploaded under `name`.
    pub fn file(&self, name: &str) -> Option<&FilePart> {
        self.files.get(name).and_then(|files| files.first())
    }
}

/// Parse a buffered body as `multipart/form-data`.
pub fn parse_multipart(
    headers: &HeaderMap,
    body: Bytes,
    max_bytes: usize,
) -> Result<MultipartForm, multer::Error> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or(multer::Error::NoMultipart)?;
    let boundary = multer::parse_boundary(content_type)?;

    let constraints =
        Constraints::new().size_limit(SizeLimit::new().whole_stream(max_bytes as u64));
    let body = stream::once(future::ready(Ok::<Bytes, Infallible>(body)));
    let mut multipart = Multipart::with_constraints(body, boundary, constraints);

    block_on(async move {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            match field.file_name().map(str::to_owned) {
                Some(file_name) => {
                    let content_type = field.content_type().map(ToString::to_string);
                    let data = field.bytes().await?;
                    form.files.entry(name).or_default().push(FilePart {
                        file_name,
                        content_type,
                        data,
                    });
                }
                None => {
                    let text = field.text().await?;
                    form.values.entry(name).or_default().push(text);
                }
            }
        }
        Ok(form)
    })
}
