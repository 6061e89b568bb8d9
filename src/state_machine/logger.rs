//! Logging hook around initiate and update

use super::{First, Next};
use std::fmt;

/// Side channel observing every initiate and update call.
///
/// All methods default to doing nothing.
pub trait LoopLogger<M, Ev, Ef>: Send + Sync {
    fn will_initiate(&self, _model: &M) {}
    fn did_initiate(&self, _model: &M, _first: &First<M, Ef>) {}
    fn will_update(&self, _model: &M, _event: &Ev) {}
    fn did_update(&self, _model: &M, _event: &Ev, _next: &Next<M, Ef>) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl<M, Ev, Ef> LoopLogger<M, Ev, Ef> for NoopLogger {}

/// Emits a `debug!` record per callback, tagged with the loop name.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    tag: String,
}

impl TracingLogger {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

impl<M, Ev, Ef> LoopLogger<M, Ev, Ef> for TracingLogger
where
    M: fmt::Debug,
    Ev: fmt::Debug,
    Ef: fmt::Debug,
{
    fn will_initiate(&self, model: &M) {
        tracing::debug!(tag = %self.tag, ?model, "Initializing loop");
    }

    fn did_initiate(&self, _model: &M, first: &First<M, Ef>) {
        tracing::debug!(
            tag = %self.tag,
            model = ?first.model(),
            effects = ?first.effects(),
            "Loop initialized"
        );
    }

    fn will_update(&self, model: &M, event: &Ev) {
        tracing::debug!(tag = %self.tag, ?model, ?event, "Event received");
    }

    fn did_update(&self, _model: &M, event: &Ev, next: &Next<M, Ef>) {
        match next.model() {
            Some(model) => tracing::debug!(
                tag = %self.tag,
                ?event,
                ?model,
                effects = ?next.effects(),
                "Model updated"
            ),
            None => tracing::debug!(
                tag = %self.tag,
                ?event,
                effects = ?next.effects(),
                "Model unchanged"
            ),
        }
    }
}
