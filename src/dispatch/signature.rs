//! Target handler signatures.
//!
//! # Responsibilities
//! - Describe each parameter a target handler declares (`ParamDescriptor`)
//! - Describe what the handler returns (`ReturnShape`)
//! - Call a handler with a bound argument vector
//! - Reject the raw-handler shape at registration
//!
//! # Design Decisions
//! - Descriptors come from the parameter types (`Param`), not from the
//!   handler value, so they cost nothing to derive per request
//! - `TargetHandler` is implemented for `Fn` arities 0..=8; anything that is
//!   not callable never reaches registration
//! - Parameter order is the binding contract: path scalars bind to path
//!   variables left to right

use std::any::{type_name, Any};
use std::fmt;

use serde::{de::DeserializeOwned, Serialize};

use crate::dispatch::error::{ContractViolation, DispatchError, RegistrationError};
use crate::dispatch::multipart::MultipartForm;
use crate::dispatch::validate::{required_fields_present, EmptyField};
use crate::http::request::InboundRequest;
use crate::http::response::{HandlerFunc, ResponseWriter};

/// Scalar types a path variable can be converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    Str,
    Bool,
    Float,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Int => "integer",
            ScalarKind::Str => "string",
            ScalarKind::Bool => "boolean",
            ScalarKind::Float => "float",
        };
        f.write_str(name)
    }
}

/// Decodes a JSON body into a type-erased value of the declared type.
#[derive(Clone, Copy)]
pub struct JsonDecoder {
    type_name: &'static str,
    decode: fn(&[u8]) -> Result<Box<dyn Any + Send>, DispatchError>,
}

impl JsonDecoder {
    /// Decoder for `T`, validating required fields after decoding.
    pub fn of<T>() -> Self
    where
        T: DeserializeOwned + Serialize + Send + 'static,
    {
        Self {
            type_name: type_name::<T>(),
            decode: decode_json::<T>,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn decode(&self, body: &[u8]) -> Result<Box<dyn Any + Send>, DispatchError> {
        (self.decode)(body)
    }
}

impl fmt::Debug for JsonDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonDecoder")
            .field("type_name", &self.type_name)
            .finish()
    }
}

impl PartialEq for JsonDecoder {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

fn decode_json<T>(body: &[u8]) -> Result<Box<dyn Any + Send>, DispatchError>
where
    T: DeserializeOwned + Serialize + Send + 'static,
{
    let value: T = serde_json::from_slice(body).map_err(DispatchError::MalformedBody)?;
    required_fields_present(&value)
        .map_err(|EmptyField(field)| DispatchError::MissingRequiredField { field })?;
    Ok(Box::new(value))
}

/// How a structured body is decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyKind {
    Json(JsonDecoder),
    Multipart,
}

/// Transport values that can appear in a raw handler signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    ResponseWriter,
    Request,
}

/// Classification of one declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamDescriptor {
    /// Bound from the decoded request body.
    Body(BodyKind),
    /// Bound from the next path variable.
    PathScalar(ScalarKind),
    /// Never bindable.
    Transport(TransportKind),
}

impl ParamDescriptor {
    pub fn is_body(&self) -> bool {
        matches!(self, ParamDescriptor::Body(_))
    }
}

impl fmt::Display for ParamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamDescriptor::Body(BodyKind::Json(decoder)) => {
                write!(f, "json body {}", decoder.type_name())
            }
            ParamDescriptor::Body(BodyKind::Multipart) => f.write_str("multipart form"),
            ParamDescriptor::PathScalar(kind) => write!(f, "path {}", kind),
            ParamDescriptor::Transport(TransportKind::ResponseWriter) => {
                f.write_str("response writer")
            }
            ParamDescriptor::Transport(TransportKind::Request) => f.write_str("request"),
        }
    }
}

/// A resolved argument.
pub enum BoundValue {
    Int(i64),
    Str(String),
    Bool(bool),
    Float(f64),
    Form(MultipartForm),
    Body(Box<dyn Any + Send>),
}

impl fmt::Debug for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundValue::Int(v) => f.debug_tuple("Int").field(v).finish(),
            BoundValue::Str(v) => f.debug_tuple("Str").field(v).finish(),
            BoundValue::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            BoundValue::Float(v) => f.debug_tuple("Float").field(v).finish(),
            BoundValue::Form(form) => f.debug_tuple("Form").field(form).finish(),
            BoundValue::Body(_) => f.write_str("Body(..)"),
        }
    }
}

/// A type that can appear as a target handler parameter.
pub trait Param: Sized + Send + 'static {
    fn descriptor() -> ParamDescriptor;

    /// Take the typed value out of a bound slot.
    fn from_bound(value: BoundValue) -> Option<Self>;
}

impl Param for i64 {
    fn descriptor() -> ParamDescriptor {
        ParamDescriptor::PathScalar(ScalarKind::Int)
    }

    fn from_bound(value: BoundValue) -> Option<Self> {
        match value {
            BoundValue::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl Param for String {
    fn descriptor() -> ParamDescriptor {
        ParamDescriptor::PathScalar(ScalarKind::Str)
    }

    fn from_bound(value: BoundValue) -> Option<Self> {
        match value {
            BoundValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl Param for bool {
    fn descriptor() -> ParamDescriptor {
        ParamDescriptor::PathScalar(ScalarKind::Bool)
    }

    fn from_bound(value: BoundValue) -> Option<Self> {
        match value {
            BoundValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl Param for f64 {
    fn descriptor() -> ParamDescriptor {
        ParamDescriptor::PathScalar(ScalarKind::Float)
    }

    fn from_bound(value: BoundValue) -> Option<Self> {
        match value {
            BoundValue::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl Param for MultipartForm {
    fn descriptor() -> ParamDescriptor {
        ParamDescriptor::Body(BodyKind::Multipart)
    }

    fn from_bound(value: BoundValue) -> Option<Self> {
        match value {
            BoundValue::Form(form) => Some(form),
            _ => None,
        }
    }
}

impl Param for ResponseWriter {
    fn descriptor() -> ParamDescriptor {
        ParamDescriptor::Transport(TransportKind::ResponseWriter)
    }

    fn from_bound(_: BoundValue) -> Option<Self> {
        None
    }
}

impl Param for InboundRequest {
    fn descriptor() -> ParamDescriptor {
        ParamDescriptor::Transport(TransportKind::Request)
    }

    fn from_bound(_: BoundValue) -> Option<Self> {
        None
    }
}

/// A structured body decoded from JSON.
///
/// Fields are required unless they are skipped or marked
/// `skip_serializing_if`; see [`required_fields_present`].
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Param for Json<T>
where
    T: DeserializeOwned + Serialize + Send + 'static,
{
    fn descriptor() -> ParamDescriptor {
        ParamDescriptor::Body(BodyKind::Json(JsonDecoder::of::<T>()))
    }

    fn from_bound(value: BoundValue) -> Option<Self> {
        match value {
            BoundValue::Body(any) => any.downcast::<T>().ok().map(|boxed| Json(*boxed)),
            _ => None,
        }
    }
}

/// What a target handler declares as its return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnShape {
    Handler,
    Nothing,
    Value(&'static str),
    Tuple(usize),
}

/// The outcome of one call.
#[derive(Debug)]
pub enum Returned {
    Handler(HandlerFunc),
    Values(usize),
    Value(&'static str),
}

/// A type that can be returned from a target handler.
///
/// Only [`HandlerFunc`] satisfies the contract; the other implementations
/// exist so a miswired handler fails with an internal error instead of
/// refusing to compile somewhere far from the route.
pub trait HandlerOutput: Send + 'static {
    fn shape() -> ReturnShape;

    fn into_returned(self) -> Returned;
}

impl HandlerOutput for HandlerFunc {
    fn shape() -> ReturnShape {
        ReturnShape::Handler
    }

    fn into_returned(self) -> Returned {
        Returned::Handler(self)
    }
}

impl HandlerOutput for () {
    fn shape() -> ReturnShape {
        ReturnShape::Nothing
    }

    fn into_returned(self) -> Returned {
        Returned::Values(0)
    }
}

impl HandlerOutput for String {
    fn shape() -> ReturnShape {
        ReturnShape::Value(type_name::<String>())
    }

    fn into_returned(self) -> Returned {
        Returned::Value(type_name::<String>())
    }
}

impl HandlerOutput for &'static str {
    fn shape() -> ReturnShape {
        ReturnShape::Value(type_name::<&str>())
    }

    fn into_returned(self) -> Returned {
        Returned::Value(type_name::<&str>())
    }
}

impl<A, B> HandlerOutput for (A, B)
where
    A: Send + 'static,
    B: Send + 'static,
{
    fn shape() -> ReturnShape {
        ReturnShape::Tuple(2)
    }

    fn into_returned(self) -> Returned {
        Returned::Values(2)
    }
}

/// Parameter descriptors and return shape of a target handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub params: Vec<ParamDescriptor>,
    pub returns: ReturnShape,
}

impl Signature {
    /// True for `(ResponseWriter, InboundRequest) -> ()`.
    pub fn is_raw_handler(&self) -> bool {
        self.returns == ReturnShape::Nothing
            && self.params
                == [
                    ParamDescriptor::Transport(TransportKind::ResponseWriter),
                    ParamDescriptor::Transport(TransportKind::Request),
                ]
    }

    pub fn body_params(&self) -> usize {
        self.params.iter().filter(|p| p.is_body()).count()
    }
}

/// Registration-time inspection.
pub fn inspect(signature: &Signature) -> Result<(), RegistrationError> {
    if signature.is_raw_handler() {
        return Err(RegistrationError::RawHandler);
    }
    Ok(())
}

/// A function value usable as a dispatch target.
///
/// `Args` is the tuple of parameter types and only disambiguates the
/// per-arity implementations.
pub trait TargetHandler<Args>: Send + Sync + 'static {
    fn signature(&self) -> Signature;

    /// Call the handler with a bound argument vector.
    fn call(&self, args: Vec<BoundValue>) -> Result<Returned, DispatchError>;
}

macro_rules! impl_target_handler {
    ($($ty:ident),*) => {
        impl<F, R, $($ty,)*> TargetHandler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: HandlerOutput,
            $($ty: Param,)*
        {
            fn signature(&self) -> Signature {
                Signature {
                    params: vec![$($ty::descriptor(),)*],
                    returns: R::shape(),
                }
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, args: Vec<BoundValue>) -> Result<Returned, DispatchError> {
                let names: &[&str] = &[$(stringify!($ty)),*];
                let expected = names.len();
                let got = args.len();
                if got != expected {
                    return Err(DispatchError::SignatureMismatch { expected, got });
                }

                let mut args = args.into_iter();
                $(
                    let $ty = args
                        .next()
                        .and_then($ty::from_bound)
                        .ok_or(DispatchError::SignatureMismatch { expected, got })?;
                )*

                Ok((self)($($ty),*).into_returned())
            }
        }
    };
}

impl_target_handler!();
impl_target_handler!(T1);
impl_target_handler!(T1, T2);
impl_target_handler!(T1, T2, T3);
impl_target_handler!(T1, T2, T3, T4);
impl_target_handler!(T1, T2, T3, T4, T5);
impl_target_handler!(T1, T2, T3, T4, T5, T6);
impl_target_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_target_handler!(T1, T2, T3, T4, T5, T6, T7, T8);

/// Check a return value against the handler contract.
pub fn expect_handler(returned: Returned) -> Result<HandlerFunc, ContractViolation> {
    match returned {
        Returned::Handler(handler) => Ok(handler),
        Returned::Values(count) => Err(ContractViolation::ReturnArity(count)),
        Returned::Value(name) => Err(ContractViolation::NotAHandler(name)),
    }
}
