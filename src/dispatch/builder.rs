//! Builder for [`DispatchPipeline`].

use std::{fmt, sync::Arc};

use super::{BatchSender, DispatchPipeline, HandlerTable};
use crate::{
    config::{ConfigError, DispatchConfig},
    session::{InMemorySession, SessionStore},
};

/// Builder for [`DispatchPipeline`].
///
/// Only the downstream queue is mandatory. The handler table defaults to
/// empty, the session to a fresh [`InMemorySession`] and the configuration
/// to [`DispatchConfig::default`].
#[derive(Default)]
#[must_use]
pub struct DispatchPipelineBuilder {
    handlers: HandlerTable,
    session: Option<Arc<dyn SessionStore>>,
    config: DispatchConfig,
    downstream: Option<BatchSender>,
}

impl fmt::Debug for DispatchPipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchPipelineBuilder")
            .field("handlers", &self.handlers)
            .field("custom_session", &self.session.is_some())
            .field("config", &self.config)
            .field("downstream", &self.downstream.is_some())
            .finish()
    }
}

impl DispatchPipelineBuilder {
    /// Start a builder with default settings.
    pub fn new() -> Self { Self::default() }

    /// Route sub-messages through `handlers`.
    pub fn handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = handlers;
        self
    }

    /// Share `session` with every handler.
    pub fn session(mut self, session: Arc<dyn SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Replace the execution settings.
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Forward event batches to `downstream`.
    pub fn downstream(mut self, downstream: BatchSender) -> Self {
        self.downstream = Some(downstream);
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingDownstream`] if no downstream queue was
    /// set.
    pub fn build(self) -> Result<DispatchPipeline, ConfigError> {
        let downstream = self.downstream.ok_or(ConfigError::MissingDownstream)?;
        let session = self
            .session
            .unwrap_or_else(|| Arc::new(InMemorySession::new()));
        Ok(DispatchPipeline {
            handlers: Arc::new(self.handlers),
            session,
            config: self.config,
            downstream,
        })
    }
}
