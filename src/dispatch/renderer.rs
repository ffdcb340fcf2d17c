//! Error rendering.
//!
//! Failures are reported to the client through one renderer per registry.
//! The renderer is installed once; later installs are ignored.

use std::sync::{Arc, OnceLock};

use axum::http::StatusCode;

use crate::http::request::InboundRequest;
use crate::http::response::ResponseWriter;

/// Turns a failure status into a response.
///
/// Called concurrently from every in-flight request, so implementations
/// must not mutate shared state.
pub trait ErrorRenderer: Send + Sync + 'static {
    fn render(&self, writer: &mut ResponseWriter, request: &InboundRequest, status: StatusCode);
}

impl<F> ErrorRenderer for F
where
    F: Fn(&mut ResponseWriter, &InboundRequest, StatusCode) + Send + Sync + 'static,
{
    fn render(&self, writer: &mut ResponseWriter, request: &InboundRequest, status: StatusCode) {
        self(writer, request, status)
    }
}

/// Write-once holder for the error renderer.
#[derive(Clone, Default)]
pub struct RendererSlot {
    inner: Arc<OnceLock<Box<dyn ErrorRenderer>>>,
}

impl RendererSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `renderer` unless one is already set. Returns whether it was installed.
    pub fn set(&self, renderer: impl ErrorRenderer) -> bool {
        self.inner.set(Box::new(renderer)).is_ok()
    }

    pub fn is_set(&self) -> bool {
        self.inner.get().is_some()
    }

    /// Render `status`, or write the bare status with an empty body when
    /// no renderer is installed.
    pub fn render(&self, writer: &mut ResponseWriter, request: &InboundRequest, status: StatusCode) {
        match self.inner.get() {
            Some(renderer) => renderer.render(writer, request, status),
            None => writer.write_status(status),
        }
    }
}

impl std::fmt::Debug for RendererSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererSlot")
            .field("set", &self.is_set())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    #[test]
    fn test_fallback_writes_bare_status() {
        let slot = RendererSlot::new();
        let request = InboundRequest::new(Method::GET, "/");
        let mut writer = ResponseWriter::new();

        slot.render(&mut writer, &request, StatusCode::BAD_REQUEST);
        assert_eq!(writer.status(), StatusCode::BAD_REQUEST);
        assert!(writer.body().is_empty());
    }

    #[test]
    fn test_first_renderer_wins() {
        let slot = RendererSlot::new();
        assert!(slot.set(|w: &mut ResponseWriter, _: &InboundRequest, status: StatusCode| {
            w.write_status(status);
            w.write(b"first");
        }));
        assert!(!slot.set(|w: &mut ResponseWriter, _: &InboundRequest, status: StatusCode| {
            w.write_status(status);
            w.write(b"second");
        }));

        let request = InboundRequest::new(Method::GET, "/");
        let mut writer = ResponseWriter::new();
        slot.render(&mut writer, &request, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(writer.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(writer.body(), b"first");
    }

    #[test]
    fn test_clones_share_the_slot() {
        let slot = RendererSlot::new();
        let clone = slot.clone();
        slot.set(|w: &mut ResponseWriter, _: &InboundRequest, status: StatusCode| {
            w.write_status(status)
        });
        assert!(clone.is_set());
    }
}
