//! Dispatch error taxonomy.

use axum::http::StatusCode;
use thiserror::Error;

use crate::dispatch::signature::ScalarKind;

/// Errors raised while binding or invoking a target handler.
///
/// Every variant maps to exactly one of two status classes, see
/// [`DispatchError::status`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A body-carrying method arrived without a body.
    #[error("request body is empty")]
    EmptyBody,

    /// The body exceeds the cap for this handler.
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// The transport failed to deliver the body.
    #[error("failed to read request body: {0}")]
    BodyUnreadable(#[source] axum::Error),

    /// The body is not valid JSON for the declared type.
    #[error("failed to parse request body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    /// The body is not a valid multipart form.
    #[error("failed to parse multipart form: {0}")]
    MalformedMultipart(#[source] multer::Error),

    /// A required field decoded to an empty value.
    #[error("required field `{field}` is empty")]
    MissingRequiredField { field: String },

    /// A path segment could not be converted to the parameter's scalar type.
    #[error("failed to parse path param under index {index} as {kind}: {segment:?}")]
    PathParamTypeMismatch {
        index: usize,
        kind: ScalarKind,
        segment: String,
    },

    /// The handler declares more than one body parameter.
    #[error("got more than one body parameter (position {position})")]
    DuplicateBodyParameter { position: usize },

    /// A parameter slot was left empty after binding.
    #[error("parameter {position} ({descriptor}) could not be bound")]
    UnboundParameter { position: usize, descriptor: String },

    /// The handler's return value is not a request handler.
    #[error("invalid handler contract: {0}")]
    InvalidHandlerContract(ContractViolation),

    /// The bound arguments do not fit the handler at call time.
    #[error("handler expected {expected} arguments, got {got}")]
    SignatureMismatch { expected: usize, got: usize },
}

/// Ways a target handler can break its return contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("handler does not return exactly one value (returned {0})")]
    ReturnArity(usize),

    #[error("handler returned `{0}` instead of a request handler")]
    NotAHandler(&'static str),
}

impl DispatchError {
    /// Status class reported to the client.
    pub fn status(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            DispatchError::InvalidHandlerContract(_) | DispatchError::SignatureMismatch { .. }
        )
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::EmptyBody => "empty_body",
            DispatchError::BodyTooLarge { .. } => "body_too_large",
            DispatchError::BodyUnreadable(_) => "body_unreadable",
            DispatchError::MalformedBody(_) => "malformed_body",
            DispatchError::MalformedMultipart(_) => "malformed_multipart",
            DispatchError::MissingRequiredField { .. } => "missing_required_field",
            DispatchError::PathParamTypeMismatch { .. } => "path_param_type_mismatch",
            DispatchError::DuplicateBodyParameter { .. } => "duplicate_body_parameter",
            DispatchError::UnboundParameter { .. } => "unbound_parameter",
            DispatchError::InvalidHandlerContract(_) => "invalid_handler_contract",
            DispatchError::SignatureMismatch { .. } => "signature_mismatch",
        }
    }
}

/// Errors that make a target handler unusable. Fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// The target already is a raw `(ResponseWriter, InboundRequest)` handler.
    #[error("raw request handlers are not valid targets, return a HandlerFunc instead")]
    RawHandler,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert_eq!(DispatchError::EmptyBody.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            DispatchError::BodyTooLarge { limit: 16 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DispatchError::UnboundParameter {
                position: 0,
                descriptor: "path i64".into()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DispatchError::InvalidHandlerContract(ContractViolation::NotAHandler("String"))
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            DispatchError::SignatureMismatch {
                expected: 2,
                got: 1
            }
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_display() {
        let err = DispatchError::PathParamTypeMismatch {
            index: 2,
            kind: ScalarKind::Int,
            segment: "abc".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to parse path param under index 2 as integer: \"abc\""
        );

        let err = DispatchError::InvalidHandlerContract(ContractViolation::ReturnArity(0));
        assert!(err.to_string().contains("exactly one value"));
    }
}
