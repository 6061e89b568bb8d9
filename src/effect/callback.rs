//! Per-dispatch completion token

use crate::connectable::Consumer;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Handed to an effect handler for one dispatched effect.
///
/// Moves only forward: active, then ended. `send()` forwards outputs while
/// active and is a no-op afterwards; `end()` is idempotent. Dropping every
/// clone without calling `end()` ends the callback implicitly, so the
/// completion hook always runs exactly once.
pub struct EffectCallback<O> {
    state: Arc<CallbackState<O>>,
}

struct CallbackState<O> {
    ended: AtomicBool,
    output: Consumer<O>,
    on_end: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl<O> CallbackState<O> {
    fn finish(&self) {
        if self.ended.swap(true, Ordering::AcqRel) {
            return;
        }
        let on_end = self
            .on_end
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(on_end) = on_end {
            on_end();
        }
    }
}

impl<O> Drop for CallbackState<O> {
    fn drop(&mut self) {
        // Abandoned without an explicit end()
        self.finish();
    }
}

impl<O> EffectCallback<O> {
    pub fn new(output: Consumer<O>, on_end: impl FnOnce() + Send + 'static) -> Self {
        Self {
            state: Arc::new(CallbackState {
                ended: AtomicBool::new(false),
                output,
                on_end: Mutex::new(Some(Box::new(on_end))),
            }),
        }
    }

    /// Forward an output, unless the callback has ended.
    pub fn send(&self, output: O) {
        if self.state.ended.load(Ordering::Acquire) {
            return;
        }
        (self.state.output)(output);
    }

    pub fn end(&self) {
        self.state.finish();
    }

    /// Send every output, then end.
    pub fn end_with(&self, outputs: impl IntoIterator<Item = O>) {
        for output in outputs {
            self.send(output);
        }
        self.end();
    }

    pub fn is_ended(&self) -> bool {
        self.state.ended.load(Ordering::Acquire)
    }

    pub(crate) fn downgrade(&self) -> WeakEffectCallback<O> {
        WeakEffectCallback {
            state: Arc::downgrade(&self.state),
        }
    }
}

impl<O> Clone for EffectCallback<O> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<O> fmt::Debug for EffectCallback<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectCallback")
            .field("ended", &self.is_ended())
            .finish()
    }
}

/// Non-owning reference, so tracking a callback never keeps it from being
/// abandoned.
pub(crate) struct WeakEffectCallback<O> {
    state: Weak<CallbackState<O>>,
}

impl<O> WeakEffectCallback<O> {
    pub(crate) fn upgrade(&self) -> Option<EffectCallback<O>> {
        self.state.upgrade().map(|state| EffectCallback { state })
    }

    /// A callback that no longer exists has ended.
    ///
    /// May run the completion hook if the temporary upgrade turns out to be
    /// the last reference; never call this while holding a lock the hook takes.
    pub(crate) fn is_ended(&self) -> bool {
        self.upgrade().is_none_or(|callback| callback.is_ended())
    }
}

impl<O> Clone for WeakEffectCallback<O> {
    fn clone(&self) -> Self {
        Self {
            state: Weak::clone(&self.state),
        }
    }
}
