//! The running loop

use super::observers::{ObserverId, ObserverRegistry};
use super::sink::ConnectionSink;
use crate::connectable::{Connectable, Consumer};
use crate::disposable::Disposable;
use crate::error::LoopError;
use crate::event_source::EventSource;
use crate::runner::WorkRunner;
use crate::state_machine::{First, LoopLogger, Update};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Everything a loop needs to start, assembled by `LoopBuilder`.
pub(crate) struct LoopParts<M, Ev, Ef> {
    pub(crate) update: Update<M, Ev, Ef>,
    pub(crate) effect_handler: Arc<dyn Connectable<Ef, Ev>>,
    pub(crate) event_sources: Vec<Arc<dyn EventSource<Ev>>>,
    pub(crate) logger: Arc<dyn LoopLogger<M, Ev, Ef>>,
    pub(crate) processing: Arc<dyn WorkRunner>,
    pub(crate) notification: Arc<dyn WorkRunner>,
}

struct LoopInner<M, Ev, Ef> {
    update: Update<M, Ev, Ef>,
    logger: Arc<dyn LoopLogger<M, Ev, Ef>>,
    processing: Arc<dyn WorkRunner>,
    notification: Arc<dyn WorkRunner>,
    observers: Arc<ObserverRegistry<M>>,
    effects: ConnectionSink<Ef>,
    subscriptions: Mutex<Vec<Box<dyn Disposable>>>,
    started: AtomicBool,
    disposed: AtomicBool,
}

/// A started loop.
///
/// Every event goes through the processing runner, so update runs for one
/// event at a time. A new model is published to observers (through the
/// notification runner) before the effects of the same update are
/// dispatched. Dropping the loop disposes it.
pub struct Loop<M, Ev, Ef>
where
    M: Clone + Send + 'static,
    Ev: Send + 'static,
    Ef: Send + 'static,
{
    inner: Arc<LoopInner<M, Ev, Ef>>,
}

/// Consumer feeding events into the loop without keeping it alive.
fn event_consumer<M, Ev, Ef>(inner: Weak<LoopInner<M, Ev, Ef>>) -> Consumer<Ev>
where
    M: Clone + Send + 'static,
    Ev: Send + 'static,
    Ef: Send + 'static,
{
    Arc::new(move |event| match inner.upgrade() {
        Some(inner) => inner.dispatch(event),
        None => tracing::debug!("Dropping event dispatched to a dropped loop"),
    })
}

impl<M, Ev, Ef> LoopInner<M, Ev, Ef>
where
    M: Clone + Send + 'static,
    Ev: Send + 'static,
    Ef: Send + 'static,
{
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn dispatch(self: &Arc<Self>, event: Ev) {
        if !self.started.load(Ordering::Acquire) {
            tracing::debug!("Dropping event dispatched before the loop started");
            return;
        }
        if self.is_disposed() {
            tracing::debug!("Dropping event dispatched after the loop was disposed");
            return;
        }
        let inner = Arc::downgrade(self);
        self.processing.post(Box::new(move || {
            if let Some(inner) = inner.upgrade().filter(|inner| !inner.is_disposed()) {
                inner.process(&event);
            }
        }));
    }

    fn process(&self, event: &Ev) {
        let model = self.observers.current();
        self.logger.will_update(&model, event);
        let next = (self.update)(&model, event);
        self.logger.did_update(&model, event, &next);

        let (model, effects) = next.into_parts();
        if let Some(model) = model {
            self.publish(model);
        }
        self.dispatch_effects(effects);
    }

    fn dispatch_effects(&self, effects: Vec<Ef>) {
        for effect in effects {
            if !self.effects.accept(effect) {
                tracing::debug!("Dropping effect emitted after the loop was disposed");
            }
        }
    }

    fn publish(&self, model: M) {
        if self.observers.publish(model) {
            self.schedule_delivery();
        }
    }

    fn schedule_delivery(&self) {
        let observers = self.observers.clone();
        self.notification.post(Box::new(move || observers.deliver_next()));
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let subscriptions = std::mem::take(
            &mut *self
                .subscriptions
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for subscription in &subscriptions {
            subscription.dispose();
        }
        self.effects.close();
        self.observers.close();
        tracing::debug!(event_sources = subscriptions.len(), "Loop disposed");
    }
}

impl<M, Ev, Ef> Loop<M, Ev, Ef>
where
    M: Clone + Send + 'static,
    Ev: Send + 'static,
    Ef: Send + 'static,
{
    /// Connect effects, go live, dispatch the first effects, then subscribe
    /// the event sources.
    pub(crate) fn start(parts: LoopParts<M, Ev, Ef>, first: First<M, Ef>) -> Result<Self, LoopError> {
        let LoopParts {
            update,
            effect_handler,
            event_sources,
            logger,
            processing,
            notification,
        } = parts;
        let (model, first_effects) = first.into_parts();

        let mut connect_error = None;
        let inner = Arc::new_cyclic(|weak| {
            let effects = match effect_handler.connect(event_consumer(weak.clone())) {
                Ok(connection) => ConnectionSink::new(connection),
                Err(err) => {
                    connect_error = Some(err);
                    ConnectionSink::closed()
                }
            };
            LoopInner {
                update,
                logger,
                processing,
                notification,
                observers: Arc::new(ObserverRegistry::new(model)),
                effects,
                subscriptions: Mutex::new(Vec::new()),
                started: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
            }
        });
        if let Some(err) = connect_error {
            tracing::error!(error = %err, "Failed to connect the effect handler");
            return Err(err);
        }

        inner.started.store(true, Ordering::Release);

        let first_job = Arc::downgrade(&inner);
        inner.processing.post(Box::new(move || {
            if let Some(inner) = first_job.upgrade().filter(|inner| !inner.is_disposed()) {
                inner.dispatch_effects(first_effects);
            }
        }));

        let events = event_consumer(Arc::downgrade(&inner));
        let subscriptions: Vec<Box<dyn Disposable>> = event_sources
            .iter()
            .map(|source| source.subscribe(events.clone()))
            .collect();
        let sources = subscriptions.len();
        inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(subscriptions);
        // A source may have disposed the loop while subscribing
        if inner.is_disposed() {
            let late = std::mem::take(
                &mut *inner
                    .subscriptions
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            );
            for subscription in late {
                subscription.dispose();
            }
        }

        tracing::debug!(event_sources = sources, "Loop started");
        Ok(Self { inner })
    }

    /// Queue an event for processing. Callable from any thread; events from
    /// one thread are processed in the order they were dispatched.
    pub fn dispatch_event(&self, event: Ev) {
        self.inner.dispatch(event);
    }

    /// Consumer dispatching into this loop. It does not keep the loop alive.
    pub fn event_consumer(&self) -> Consumer<Ev> {
        event_consumer(Arc::downgrade(&self.inner))
    }

    /// Register an observer. It receives the current model first, then
    /// every later one, on the notification runner.
    ///
    /// Returns `None` if the loop has been disposed.
    pub fn add_observer(&self, observer: impl Fn(M) + Send + Sync + 'static) -> Option<ObserverId> {
        let id = self.inner.observers.add(Arc::new(observer))?;
        self.inner.schedule_delivery();
        tracing::debug!(observer_id = ?id, "Observer added");
        Some(id)
    }

    /// Returns whether the observer was registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.inner.observers.remove(id)
    }

    /// Replace the model outside of update, in order with event processing.
    /// Observers are notified; no effects run.
    pub fn replace_model(&self, model: M) {
        if self.inner.is_disposed() {
            tracing::debug!("Ignoring model replacement on a disposed loop");
            return;
        }
        let inner = Arc::downgrade(&self.inner);
        self.inner.processing.post(Box::new(move || {
            if let Some(inner) = inner.upgrade().filter(|inner| !inner.is_disposed()) {
                inner.publish(model);
            }
        }));
    }

    /// Snapshot of the current model.
    pub fn model(&self) -> M {
        self.inner.observers.current()
    }

    pub fn is_running(&self) -> bool {
        self.inner.started.load(Ordering::Acquire) && !self.inner.is_disposed()
    }

    /// Dispose event source subscriptions, then the effect connection
    /// (cancelling in-flight effects), then every observer. Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl<M, Ev, Ef> Drop for Loop<M, Ev, Ef>
where
    M: Clone + Send + 'static,
    Ev: Send + 'static,
    Ef: Send + 'static,
{
    fn drop(&mut self) {
        self.inner.dispose();
    }
}
