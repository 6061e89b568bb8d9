//! Single-connection discipline

use super::Connection;
use crate::error::{ErrorHook, LoopError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Tracks whether a connectable currently has a live connection.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConnectionSlot {
    connected: Arc<AtomicBool>,
}

impl ConnectionSlot {
    pub(crate) fn acquire(&self) -> Result<SlotLease, LoopError> {
        self.connected
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LoopError::AlreadyConnected)?;
        Ok(SlotLease {
            connected: self.connected.clone(),
        })
    }
}

/// Frees the slot when dropped.
#[derive(Debug)]
pub(crate) struct SlotLease {
    connected: Arc<AtomicBool>,
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        self.connected.store(false, Ordering::Release);
    }
}

/// Wraps a connection so that dispose is idempotent, releases the slot only
/// after the inner dispose returned, and reports `accept()` after dispose.
pub(crate) struct GuardedConnection<I> {
    inner: Box<dyn Connection<I>>,
    lease: Mutex<Option<SlotLease>>,
    disposed: AtomicBool,
    error_hook: ErrorHook,
}

impl<I> GuardedConnection<I> {
    pub(crate) fn new(
        inner: Box<dyn Connection<I>>,
        lease: Option<SlotLease>,
        error_hook: ErrorHook,
    ) -> Self {
        Self {
            inner,
            lease: Mutex::new(lease),
            disposed: AtomicBool::new(false),
            error_hook,
        }
    }

    fn release(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.dispose();
        let lease = self.lease.lock().unwrap_or_else(PoisonError::into_inner).take();
        drop(lease);
    }
}

impl<I> Connection<I> for GuardedConnection<I> {
    fn accept(&self, input: I) {
        if self.disposed.load(Ordering::Acquire) {
            self.error_hook.report(LoopError::UseAfterDispose);
            return;
        }
        self.inner.accept(input);
    }

    fn dispose(&self) {
        self.release();
    }
}

impl<I> Drop for GuardedConnection<I> {
    fn drop(&mut self) {
        self.release();
    }
}
