//! Argument binding.
//!
//! # Responsibilities
//! - Reject empty bodies on body-carrying methods
//! - Decode the structured body (JSON or multipart) for the body parameter
//! - Bind path scalars to path variables, left to right
//! - Return a bound argument vector with every slot filled
//!
//! # Design Decisions
//! - Path variables are located by position: a scalar parameter takes the
//!   first `{...}` segment of the route pattern after the last one used,
//!   and reads the request path segment at the same index
//! - When parameter order and path-variable order diverge the first match
//!   wins; the caller owns that ordering
//! - Only the route pattern's braces are inspected, its syntax is not validated

use axum::http::Method;

use crate::dispatch::error::DispatchError;
use crate::dispatch::multipart::{parse_multipart, DEFAULT_MAX_MULTIPART_BYTES};
use crate::dispatch::signature::{BodyKind, BoundValue, ParamDescriptor, ScalarKind};
use crate::http::request::InboundRequest;

/// Default cap on a buffered body for handlers without a multipart form.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Limits applied while buffering and binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindLimits {
    pub max_body_bytes: usize,
    pub max_multipart_bytes: usize,
}

impl BindLimits {
    /// Bytes a request may buffer before binding against `params`.
    ///
    /// Handlers taking a multipart form get the multipart cap, every other
    /// handler the plain body cap.
    pub fn body_cap(&self, params: &[ParamDescriptor]) -> usize {
        if params.contains(&ParamDescriptor::Body(BodyKind::Multipart)) {
            self.max_multipart_bytes
        } else {
            self.max_body_bytes
        }
    }
}

impl Default for BindLimits {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_multipart_bytes: DEFAULT_MAX_MULTIPART_BYTES,
        }
    }
}

/// Methods that conventionally carry a body.
pub fn expects_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

/// Build the bound argument vector for `params` from `request`.
pub fn bind_arguments(
    params: &[ParamDescriptor],
    request: &InboundRequest,
    limits: BindLimits,
) -> Result<Vec<BoundValue>, DispatchError> {
    if params.is_empty() {
        return Ok(Vec::new());
    }

    if expects_body(request.method()) && request.content_length() == 0 {
        return Err(DispatchError::EmptyBody);
    }

    let path_parts: Vec<&str> = request.path().split('/').collect();
    let pattern_parts: Vec<&str> = request
        .route_pattern()
        .map(|pattern| pattern.split('/').collect())
        .unwrap_or_default();

    let mut slots: Vec<Option<BoundValue>> = params.iter().map(|_| None).collect();
    let mut body_consumed = false;
    let mut last_matched: Option<usize> = None;

    for (position, param) in params.iter().enumerate() {
        match param {
            ParamDescriptor::Body(kind) => {
                if body_consumed {
                    return Err(DispatchError::DuplicateBodyParameter { position });
                }
                slots[position] = Some(bind_body(kind, request, limits)?);
                body_consumed = true;
            }
            ParamDescriptor::PathScalar(kind) => {
                let start = last_matched.map_or(0, |idx| idx + 1);
                let Some(index) = next_path_variable(&pattern_parts, start) else {
                    continue;
                };
                last_matched = Some(index);

                let Some(raw) = path_parts.get(index) else {
                    continue;
                };
                slots[position] = Some(convert_segment(raw, *kind, index)?);
            }
            ParamDescriptor::Transport(_) => {}
        }
    }

    slots
        .into_iter()
        .zip(params)
        .enumerate()
        .map(|(position, (slot, param))| {
            slot.ok_or_else(|| DispatchError::UnboundParameter {
                position,
                descriptor: param.to_string(),
            })
        })
        .collect()
}

fn bind_body(
    kind: &BodyKind,
    request: &InboundRequest,
    limits: BindLimits,
) -> Result<BoundValue, DispatchError> {
    let body = request.body().cloned().unwrap_or_default();
    match kind {
        BodyKind::Multipart => {
            parse_multipart(request.headers(), body, limits.max_multipart_bytes)
                .map(BoundValue::Form)
                .map_err(DispatchError::MalformedMultipart)
        }
        BodyKind::Json(decoder) => decoder.decode(&body).map(BoundValue::Body),
    }
}

/// Index of the first `{...}` pattern segment at or after `start`.
fn next_path_variable(pattern_parts: &[&str], start: usize) -> Option<usize> {
    pattern_parts
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, part)| part.contains('{') && part.contains('}'))
        .map(|(idx, _)| idx)
}

fn convert_segment(raw: &str, kind: ScalarKind, index: usize) -> Result<BoundValue, DispatchError> {
    let mismatch = || DispatchError::PathParamTypeMismatch {
        index,
        kind,
        segment: raw.to_owned(),
    };

    let segment = urlencoding::decode(raw).map_err(|_| mismatch())?;
    let value = match kind {
        ScalarKind::Int => BoundValue::Int(segment.parse().map_err(|_| mismatch())?),
        ScalarKind::Str => BoundValue::Str(segment.into_owned()),
        ScalarKind::Bool => BoundValue::Bool(parse_bool(&segment).ok_or_else(mismatch)?),
        ScalarKind::Float => BoundValue::Float(segment.parse().map_err(|_| mismatch())?),
    };
    Ok(value)
}

/// Boolean spellings accepted in path segments.
fn parse_bool(segment: &str) -> Option<bool> {
    match segment {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
