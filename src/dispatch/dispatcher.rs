//! Registration and invocation.
//!
//! # Responsibilities
//! - Register target handlers (`BodyRest::handle_to`)
//! - Per request: bind, invoke the target, delegate to the returned handler
//! - Convert every failure into a logged, rendered status
//!
//! # Design Decisions
//! - Nothing is cached per handler: the signature is re-derived on every request
//! - Binding and invocation are synchronous; only body buffering in
//!   `Dispatcher::serve` awaits
//! - Buffering is capped per handler: the multipart cap for handlers taking
//!   a `MultipartForm`, the body cap otherwise. An oversized body fails the
//!   same way whether or not it declared a `Content-Length`
//! - No error escapes `dispatch`; the transport always gets a response

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use axum::{body::Body, http::Request, response::Response};

use crate::config::LimitsConfig;
use crate::dispatch::binder::{bind_arguments, BindLimits};
use crate::dispatch::error::{DispatchError, RegistrationError};
use crate::dispatch::renderer::{ErrorRenderer, RendererSlot};
use crate::dispatch::signature::{
    expect_handler, inspect, BoundValue, Returned, Signature, TargetHandler,
};
use crate::http::request::{BodyReadError, InboundRequest};
use crate::http::response::{HandlerFunc, ResponseWriter};
use crate::observability::metrics;

/// Registry producing dispatchers that share one error renderer.
#[derive(Debug, Clone)]
pub struct BodyRest {
    renderer: RendererSlot,
    limits: BindLimits,
}

impl BodyRest {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            renderer: RendererSlot::new(),
            limits: BindLimits {
                max_body_bytes: limits.max_body_bytes,
                max_multipart_bytes: limits.max_multipart_bytes,
            },
        }
    }

    /// Install the error renderer. Only the first call has an effect;
    /// returns whether this call installed it.
    pub fn set_error_renderer(&self, renderer: impl ErrorRenderer) -> bool {
        self.renderer.set(renderer)
    }

    /// Wrap `target` into a dispatcher.
    ///
    /// Fails when `target` is itself a raw `(ResponseWriter, InboundRequest)`
    /// handler. Callers are expected to abort startup on error.
    pub fn handle_to<H, Args>(&self, target: H) -> Result<Dispatcher, RegistrationError>
    where
        H: TargetHandler<Args>,
        Args: 'static,
    {
        let signature = target.signature();
        inspect(&signature)?;

        if signature.body_params() > 1 {
            tracing::warn!(
                params = signature.params.len(),
                "Handler declares more than one body parameter, every request will be rejected"
            );
        }

        tracing::debug!(
            params = signature.params.len(),
            returns = ?signature.returns,
            "Handler registered"
        );

        Ok(Dispatcher {
            target: Arc::new(Target {
                handler: target,
                _args: PhantomData,
            }),
            renderer: self.renderer.clone(),
            limits: self.limits,
        })
    }
}

impl Default for BodyRest {
    fn default() -> Self {
        Self {
            renderer: RendererSlot::new(),
            limits: BindLimits::default(),
        }
    }
}

/// Object-safe view of a target handler.
trait ErasedTarget: Send + Sync {
    fn signature(&self) -> Signature;
    fn call(&self, args: Vec<BoundValue>) -> Result<Returned, DispatchError>;
}

struct Target<H, Args> {
    handler: H,
    _args: PhantomData<fn() -> Args>,
}

impl<H, Args> ErasedTarget for Target<H, Args>
where
    H: TargetHandler<Args>,
    Args: 'static,
{
    fn signature(&self) -> Signature {
        self.handler.signature()
    }

    fn call(&self, args: Vec<BoundValue>) -> Result<Returned, DispatchError> {
        self.handler.call(args)
    }
}

/// Request-handling callback wrapping one target handler.
#[derive(Clone)]
pub struct Dispatcher {
    target: Arc<dyn ErasedTarget>,
    renderer: RendererSlot,
    limits: BindLimits,
}

impl Dispatcher {
    /// Serve one exchange: bind, invoke, delegate.
    pub fn dispatch(&self, writer: &mut ResponseWriter, request: &InboundRequest) {
        let start = Instant::now();
        match self.resolve(request) {
            Ok(handler) => {
                handler.serve_http(writer, request);
                metrics::record_dispatch("ok", start);
            }
            Err(e) => self.fail(writer, request, e, start),
        }
    }

    /// Serve an axum request.
    ///
    /// A zero-parameter target is invoked even when the body exceeds the
    /// cap; it then sees no body.
    pub async fn serve(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let params = self.target.signature().params;
        let limit = self.limits.body_cap(&params);
        let (inbound, read_error) = InboundRequest::from_http(request, limit).await;
        let mut writer = ResponseWriter::new();

        match read_error {
            None => self.dispatch(&mut writer, &inbound),
            Some(BodyReadError::TooLarge { .. }) if params.is_empty() => {
                tracing::debug!(
                    request_id = %inbound.request_id(),
                    limit,
                    "Oversized body dropped for zero-parameter handler"
                );
                self.dispatch(&mut writer, &inbound)
            }
            Some(BodyReadError::TooLarge { limit }) => self.fail(
                &mut writer,
                &inbound,
                DispatchError::BodyTooLarge { limit },
                start,
            ),
            Some(BodyReadError::Transport(e)) => self.fail(
                &mut writer,
                &inbound,
                DispatchError::BodyUnreadable(e),
                start,
            ),
        }

        writer.into_response()
    }

    fn resolve(&self, request: &InboundRequest) -> Result<HandlerFunc, DispatchError> {
        let signature = self.target.signature();
        let args = bind_arguments(&signature.params, request, self.limits)?;
        let returned = self.target.call(args)?;
        expect_handler(returned).map_err(DispatchError::InvalidHandlerContract)
    }

    fn fail(
        &self,
        writer: &mut ResponseWriter,
        request: &InboundRequest,
        error: DispatchError,
        start: Instant,
    ) {
        let status = error.status();
        if error.is_client_error() {
            tracing::warn!(
                request_id = %request.request_id(),
                method = %request.method(),
                path = %request.path(),
                error = %error,
                "Rejecting request"
            );
        } else {
            tracing::error!(
                request_id = %request.request_id(),
                method = %request.method(),
                path = %request.path(),
                error = %error,
                "Handler contract violated"
            );
        }

        metrics::record_dispatch(error.kind(), start);
        self.renderer.render(writer, request, status);
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("params", &self.target.signature().params.len())
            .field("renderer", &self.renderer)
            .finish()
    }
}
