//! Loop construction

use super::controller::LoopController;
use super::event_loop::{Loop, LoopParts};
use crate::config::RuntimeConfig;
use crate::connectable::Connectable;
use crate::error::LoopError;
use crate::event_source::EventSource;
use crate::runner::{ImmediateWorkRunner, WorkRunner};
use crate::state_machine::{First, Initiate, LoopLogger, Next, NoopLogger, Update};
use std::sync::Arc;

/// Shorthand for [`LoopBuilder::new`].
pub fn loop_builder<M, Ev, Ef>(
    update: impl Fn(&M, &Ev) -> Next<M, Ef> + Send + Sync + 'static,
    effect_handler: impl Connectable<Ef, Ev> + 'static,
) -> LoopBuilder<M, Ev, Ef>
where
    M: Clone + Send + 'static,
    Ev: Send + 'static,
    Ef: Send + 'static,
{
    LoopBuilder::new(update, effect_handler)
}

/// Collects the update function, effect handler, event sources, logger
/// and execution contexts; `start()` produces a running [`Loop`].
///
/// A builder can start any number of loops, one at a time: the effect
/// handler and event sources are shared between them.
pub struct LoopBuilder<M, Ev, Ef> {
    update: Update<M, Ev, Ef>,
    effect_handler: Arc<dyn Connectable<Ef, Ev>>,
    event_sources: Vec<Arc<dyn EventSource<Ev>>>,
    logger: Arc<dyn LoopLogger<M, Ev, Ef>>,
    processing: Arc<dyn WorkRunner>,
    notification: Arc<dyn WorkRunner>,
}

impl<M, Ev, Ef> Clone for LoopBuilder<M, Ev, Ef> {
    fn clone(&self) -> Self {
        Self {
            update: self.update.clone(),
            effect_handler: self.effect_handler.clone(),
            event_sources: self.event_sources.clone(),
            logger: self.logger.clone(),
            processing: self.processing.clone(),
            notification: self.notification.clone(),
        }
    }
}

impl<M, Ev, Ef> LoopBuilder<M, Ev, Ef>
where
    M: Clone + Send + 'static,
    Ev: Send + 'static,
    Ef: Send + 'static,
{
    pub fn new(
        update: impl Fn(&M, &Ev) -> Next<M, Ef> + Send + Sync + 'static,
        effect_handler: impl Connectable<Ef, Ev> + 'static,
    ) -> Self {
        Self {
            update: Arc::new(update),
            effect_handler: Arc::new(effect_handler),
            event_sources: Vec::new(),
            logger: Arc::new(NoopLogger),
            processing: Arc::new(ImmediateWorkRunner::new()),
            notification: Arc::new(ImmediateWorkRunner::new()),
        }
    }

    #[must_use]
    pub fn with_event_source(mut self, source: impl EventSource<Ev> + 'static) -> Self {
        self.event_sources.push(Arc::new(source));
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: impl LoopLogger<M, Ev, Ef> + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Context that runs update and dispatches effects.
    #[must_use]
    pub fn with_processing_runner(mut self, runner: Arc<dyn WorkRunner>) -> Self {
        self.processing = runner;
        self
    }

    /// Context that delivers models to observers.
    #[must_use]
    pub fn with_notification_runner(mut self, runner: Arc<dyn WorkRunner>) -> Self {
        self.notification = runner;
        self
    }

    #[must_use]
    pub fn with_config(self, config: &RuntimeConfig) -> Self {
        self.with_processing_runner(config.processing.build())
            .with_notification_runner(config.notification.build())
    }

    /// Start from a model that is already the first model.
    ///
    /// # Errors
    ///
    /// Returns the effect handler's connect error, typically
    /// [`LoopError::AlreadyConnected`] while another loop built from the
    /// same handler is still running.
    pub fn start(&self, model: M) -> Result<Loop<M, Ev, Ef>, LoopError> {
        Loop::start(self.parts(), First::first(model))
    }

    /// Run `initiate` on the start model, then start from its result.
    ///
    /// # Errors
    ///
    /// See [`LoopBuilder::start`].
    pub fn start_with(
        &self,
        model: M,
        initiate: impl Fn(M) -> First<M, Ef> + Send + Sync + 'static,
    ) -> Result<Loop<M, Ev, Ef>, LoopError> {
        let initiate: Initiate<M, Ef> = Arc::new(initiate);
        self.logger.will_initiate(&model);
        let first = initiate(model.clone());
        self.logger.did_initiate(&model, &first);
        Loop::start(self.parts(), first)
    }

    /// Controller that starts and stops loops from this builder, beginning
    /// at `model`.
    pub fn controller(self, model: M) -> LoopController<M, Ev, Ef> {
        LoopController::new(self, model)
    }

    fn parts(&self) -> LoopParts<M, Ev, Ef> {
        LoopParts {
            update: self.update.clone(),
            effect_handler: self.effect_handler.clone(),
            event_sources: self.event_sources.clone(),
            logger: self.logger.clone(),
            processing: self.processing.clone(),
            notification: self.notification.clone(),
        }
    }
}
