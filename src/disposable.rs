//! Cancellation handles
//!
//! Anything that can be torn down exactly once: effect cancellation tokens,
//! event source subscriptions, spawned tasks.

use std::sync::{Mutex, PoisonError};
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

/// A resource that can be released. Implementations must tolerate repeated calls.
pub trait Disposable: Send + Sync {
    fn dispose(&self);
}

impl Disposable for CancellationToken {
    fn dispose(&self) {
        self.cancel();
    }
}

impl Disposable for AbortHandle {
    fn dispose(&self) {
        self.abort();
    }
}

impl<D: Disposable + ?Sized> Disposable for Box<D> {
    fn dispose(&self) {
        (**self).dispose();
    }
}

impl<D: Disposable + ?Sized> Disposable for std::sync::Arc<D> {
    fn dispose(&self) {
        (**self).dispose();
    }
}

/// Nothing to release.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDisposable;

impl Disposable for NoopDisposable {
    fn dispose(&self) {}
}

/// Runs a closure on the first `dispose()`; later calls do nothing.
pub struct AnonymousDisposable {
    on_dispose: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl AnonymousDisposable {
    pub fn new(on_dispose: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_dispose: Mutex::new(Some(Box::new(on_dispose))),
        }
    }
}

impl Disposable for AnonymousDisposable {
    fn dispose(&self) {
        let on_dispose = self
            .on_dispose
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(on_dispose) = on_dispose {
            on_dispose();
        }
    }
}

/// Disposes a set of children together.
#[derive(Default)]
pub struct CompositeDisposable {
    children: Mutex<Vec<Box<dyn Disposable>>>,
}

impl CompositeDisposable {
    pub fn new(children: Vec<Box<dyn Disposable>>) -> Self {
        Self {
            children: Mutex::new(children),
        }
    }
}

impl Disposable for CompositeDisposable {
    fn dispose(&self) {
        let children = std::mem::take(
            &mut *self.children.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for child in children {
            child.dispose();
        }
    }
}
