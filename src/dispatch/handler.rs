//! Handler trait, routing table and per-batch handler context.

use std::{collections::HashMap, fmt, future::Future, sync::Arc};

use async_trait::async_trait;

use super::batch::{DecodedEvent, EventSink};
use crate::{
    config::ConfigError,
    error::HandlerError,
    frame::Frame,
    session::{ConnectionId, SessionStore},
};

/// Processes sub-messages carrying one method id.
///
/// Handlers for one outer frame may run concurrently, so implementations
/// must only touch shared state through the [`SessionStore`] and the
/// context's event sink.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handle one sub-message.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] when the sub-message cannot be processed.
    /// The dispatcher logs it and carries on with the remaining
    /// sub-messages.
    async fn handle(&self, ctx: &HandlerContext, message: &Frame) -> Result<(), HandlerError>;
}

/// Adapter turning an async closure into a [`Handler`].
pub struct HandlerFn<F>(F);

impl<F> HandlerFn<F> {
    /// Wrap `f`.
    pub fn new(f: F) -> Self { Self(f) }
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("HandlerFn") }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(HandlerContext, Frame) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, ctx: &HandlerContext, message: &Frame) -> Result<(), HandlerError> {
        (self.0)(ctx.clone(), message.clone()).await
    }
}

/// State handed to a handler for one sub-message.
#[derive(Clone)]
pub struct HandlerContext {
    connection: ConnectionId,
    session: Arc<dyn SessionStore>,
    events: EventSink,
}

impl HandlerContext {
    /// Build a context for a batch on `connection`.
    #[must_use]
    pub fn new(connection: ConnectionId, session: Arc<dyn SessionStore>, events: EventSink) -> Self {
        Self {
            connection,
            session,
            events,
        }
    }

    /// Connection the outer frame arrived on.
    #[must_use]
    pub fn connection(&self) -> ConnectionId { self.connection }

    /// Shared session state.
    #[must_use]
    pub fn session(&self) -> &dyn SessionStore { self.session.as_ref() }

    /// Add `event` to the current batch.
    pub fn emit(&self, event: DecodedEvent) { self.events.push(event); }
}

impl fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerContext")
            .field("connection", &self.connection)
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

/// Static routing table from method id to handler.
///
/// Built once at startup; lookups never allocate or lock.
///
/// # Examples
///
/// ```
/// use bundlewire::{
///     dispatch::{HandlerContext, HandlerTable},
///     error::HandlerError,
///     frame::Frame,
/// };
///
/// async fn ignore(_ctx: HandlerContext, _message: Frame) -> Result<(), HandlerError> { Ok(()) }
///
/// let table = HandlerTable::new()
///     .route_fn(0x10, ignore)
///     .expect("unique method id");
/// assert!(table.get(0x10).is_some());
/// assert!(table.get(0x11).is_none());
/// ```
#[derive(Clone, Default)]
pub struct HandlerTable {
    routes: HashMap<u16, Arc<dyn Handler>>,
}

impl HandlerTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register `handler` for `method_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateRoute`] if `method_id` already has a
    /// handler.
    pub fn route<H: Handler>(mut self, method_id: u16, handler: H) -> Result<Self, ConfigError> {
        if self.routes.contains_key(&method_id) {
            return Err(ConfigError::DuplicateRoute(method_id));
        }
        self.routes.insert(method_id, Arc::new(handler));
        Ok(self)
    }

    /// Register an async closure for `method_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateRoute`] if `method_id` already has a
    /// handler.
    pub fn route_fn<F, Fut>(self, method_id: u16, f: F) -> Result<Self, ConfigError>
    where
        F: Fn(HandlerContext, Frame) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.route(method_id, HandlerFn::new(f))
    }

    /// Handler registered for `method_id`.
    #[must_use]
    pub fn get(&self, method_id: u16) -> Option<&Arc<dyn Handler>> { self.routes.get(&method_id) }

    /// Registered method ids, in no particular order.
    #[must_use]
    pub fn method_ids(&self) -> Vec<u16> { self.routes.keys().copied().collect() }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize { self.routes.len() }

    /// Whether no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.routes.is_empty() }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids = self.method_ids();
        ids.sort_unstable();
        f.debug_struct("HandlerTable")
            .field("method_ids", &ids)
            .finish()
    }
}
