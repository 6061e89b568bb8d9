//! Connection wrapper that can be closed while accepts are in flight

use crate::connectable::Connection;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Forwards to a connection until closed, then drops inputs.
///
/// The wrapped connection is disposed by whoever leaves last: `close()` if
/// nothing is being accepted, otherwise the final in-flight `accept()`.
/// The connection therefore never sees `accept()` after `dispose()`, and
/// closing from inside an accept does not deadlock.
pub(crate) struct ConnectionSink<T> {
    connection: Mutex<Option<Arc<dyn Connection<T>>>>,
    in_flight: AtomicUsize,
    closed: AtomicBool,
}

impl<T> ConnectionSink<T> {
    pub(crate) fn new(connection: Box<dyn Connection<T>>) -> Self {
        Self {
            connection: Mutex::new(Some(Arc::from(connection))),
            in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// A sink that drops everything.
    pub(crate) fn closed() -> Self {
        Self {
            connection: Mutex::new(None),
            in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(true),
        }
    }

    /// Returns false if the input was dropped because the sink is closed.
    pub(crate) fn accept(&self, input: T) -> bool {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        // Leaves even if the connection panics
        let _in_flight = InFlight { sink: self };
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }

        let connection = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(connection) = &connection {
            connection.accept(input);
        }
        true
    }

    pub(crate) fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.in_flight.load(Ordering::SeqCst) == 0 {
            self.release();
        }
    }

    fn leave(&self) {
        let remaining = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 && self.closed.load(Ordering::SeqCst) {
            self.release();
        }
    }

    fn release(&self) {
        let connection = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(connection) = connection {
            connection.dispose();
        }
    }
}

struct InFlight<'a, T> {
    sink: &'a ConnectionSink<T>,
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        self.sink.leave();
    }
}
