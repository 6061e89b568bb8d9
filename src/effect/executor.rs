//! Wraps one effect handler as a connection and tracks its in-flight effects

use super::{EffectCallback, EffectHandler, WeakEffectCallback};
use crate::connectable::{
    Connectable, Connection, ConnectionSlot, Consumer, GuardedConnection,
};
use crate::disposable::Disposable;
use crate::error::{ErrorHook, LoopError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Dispatches payloads to a handler, one tracked entry per dispatch.
///
/// Every entry is removed when its callback ends (explicitly or by being
/// dropped). `dispose()` cancels and force-ends whatever is still running.
pub struct EffectExecutor<P, E> {
    handler: Arc<dyn EffectHandler<P, E>>,
    state: Arc<ExecutorState<E>>,
}

struct ExecutorState<E> {
    output: Mutex<Option<Consumer<E>>>,
    /// Set before the output is detached; checked again right before emitting
    detached: AtomicBool,
    ongoing: Mutex<OngoingEffects<E>>,
    next_id: AtomicU64,
}

struct OngoingEffects<E> {
    disposed: bool,
    entries: HashMap<u64, OngoingEffect<E>>,
}

struct OngoingEffect<E> {
    callback: WeakEffectCallback<E>,
    cancel: Box<dyn Disposable>,
}

impl<E> ExecutorState<E> {
    fn ongoing(&self) -> MutexGuard<'_, OngoingEffects<E>> {
        self.ongoing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, value: E) {
        let output = self
            .output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match output {
            Some(output) if !self.detached.load(Ordering::SeqCst) => output(value),
            _ => {}
        }
    }

    fn complete(&self, id: u64) {
        let removed = self.ongoing().entries.remove(&id);
        // Dropped outside the lock
        drop(removed);
    }
}

impl<P, E: Send + 'static> EffectExecutor<P, E> {
    pub fn new(handler: Arc<dyn EffectHandler<P, E>>, output: Consumer<E>) -> Self {
        Self {
            handler,
            state: Arc::new(ExecutorState {
                output: Mutex::new(Some(output)),
                detached: AtomicBool::new(false),
                ongoing: Mutex::new(OngoingEffects {
                    disposed: false,
                    entries: HashMap::new(),
                }),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn handle(&self, payload: P) {
        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);

        let output: Consumer<E> = {
            let state = Arc::downgrade(&self.state);
            Arc::new(move |value| {
                if let Some(state) = state.upgrade() {
                    state.emit(value);
                }
            })
        };
        let on_end = {
            let state = Arc::downgrade(&self.state);
            move || {
                if let Some(state) = state.upgrade() {
                    state.complete(id);
                }
            }
        };

        let callback = EffectCallback::new(output, on_end);
        let tracked = callback.downgrade();
        let cancel = self.handler.handle(payload, callback);

        let rejected = {
            let mut ongoing = self.state.ongoing();
            if ongoing.disposed {
                Some(cancel)
            } else {
                ongoing.entries.insert(
                    id,
                    OngoingEffect {
                        callback: tracked.clone(),
                        cancel,
                    },
                );
                None
            }
        };

        if let Some(cancel) = rejected {
            // Disposed while the handler was running
            cancel.dispose();
            if let Some(callback) = tracked.upgrade() {
                callback.end();
            }
            return;
        }

        // The handler may have ended before the entry was stored
        if tracked.is_ended() {
            self.state.complete(id);
        }
    }
}

impl<P, E> EffectExecutor<P, E> {
    /// Cancel and end every in-flight effect, then detach the output.
    /// Idempotent.
    ///
    /// No emit starts reaching the output once this returns. An emit already
    /// past its check may still complete.
    pub fn dispose(&self) {
        let entries = {
            let mut ongoing = self.state.ongoing();
            if ongoing.disposed {
                return;
            }
            ongoing.disposed = true;
            self.state.detached.store(true, Ordering::SeqCst);
            std::mem::take(&mut ongoing.entries)
        };
        self.state
            .output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let cancelled = entries.len();
        for (_, effect) in entries {
            effect.cancel.dispose();
            if let Some(callback) = effect.callback.upgrade() {
                callback.end();
            }
        }
        tracing::debug!(cancelled, "Effect executor disposed");
    }

    /// Number of dispatched effects that have not ended yet.
    pub fn ongoing_count(&self) -> usize {
        self.state.ongoing().entries.len()
    }
}

impl<P, E: Send + 'static> Connection<P> for EffectExecutor<P, E> {
    fn accept(&self, input: P) {
        self.handle(input);
    }

    fn dispose(&self) {
        EffectExecutor::dispose(self);
    }
}

impl<P, E> Drop for EffectExecutor<P, E> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Connectable that creates a fresh executor around a shared handler on
/// every connection.
pub struct HandlerConnectable<P, E> {
    handler: Arc<dyn EffectHandler<P, E>>,
    slot: ConnectionSlot,
    error_hook: ErrorHook,
}

impl<P, E> HandlerConnectable<P, E> {
    pub fn new(handler: impl EffectHandler<P, E> + 'static) -> Self {
        Self::from_arc(Arc::new(handler))
    }

    pub fn from_arc(handler: Arc<dyn EffectHandler<P, E>>) -> Self {
        Self {
            handler,
            slot: ConnectionSlot::default(),
            error_hook: ErrorHook::default(),
        }
    }

    #[must_use]
    pub fn with_error_hook(mut self, error_hook: ErrorHook) -> Self {
        self.error_hook = error_hook;
        self
    }
}

impl<P: 'static, E: Send + 'static> Connectable<P, E> for HandlerConnectable<P, E> {
    fn connect(&self, output: Consumer<E>) -> Result<Box<dyn Connection<P>>, LoopError> {
        let lease = self.slot.acquire()?;
        let executor = EffectExecutor::new(self.handler.clone(), output);
        Ok(Box::new(GuardedConnection::new(
            Box::new(executor),
            Some(lease),
            self.error_hook.clone(),
        )))
    }
}
