//! Connectable / Connection capability pair
//!
//! A `Connectable<I, O>` is a factory: given a consumer of outputs it
//! produces a `Connection<I>` that accepts inputs until disposed. Effect
//! handlers, views and routers all share this shape.

mod compose;
mod guard;

pub use compose::{ConnectableExt, Contramap, FilterMapOutput, MapOutput};
pub(crate) use guard::{ConnectionSlot, GuardedConnection};

use crate::error::{ErrorHook, LoopError};
use std::sync::Arc;

/// Sink for values flowing out of a connection.
pub type Consumer<T> = Arc<dyn Fn(T) + Send + Sync>;

/// One live connection. `accept()` after `dispose()` is a programming error.
pub trait Connection<I>: Send + Sync {
    fn accept(&self, input: I);
    fn dispose(&self);
}

/// Produces connections bound to an output consumer.
///
/// A connectable may be connected at most once at a time: `connect()` may be
/// called again only after the previous connection's `dispose()` returned.
pub trait Connectable<I, O>: Send + Sync {
    /// # Errors
    ///
    /// Returns [`LoopError::AlreadyConnected`] while a previous connection is live.
    fn connect(&self, output: Consumer<O>) -> Result<Box<dyn Connection<I>>, LoopError>;
}

// ============================================================================
// Smart pointer implementations
// ============================================================================

impl<I, C: Connection<I> + ?Sized> Connection<I> for Box<C> {
    fn accept(&self, input: I) {
        (**self).accept(input);
    }

    fn dispose(&self) {
        (**self).dispose();
    }
}

impl<I, C: Connection<I> + ?Sized> Connection<I> for Arc<C> {
    fn accept(&self, input: I) {
        (**self).accept(input);
    }

    fn dispose(&self) {
        (**self).dispose();
    }
}

impl<I, O, C: Connectable<I, O> + ?Sized> Connectable<I, O> for Arc<C> {
    fn connect(&self, output: Consumer<O>) -> Result<Box<dyn Connection<I>>, LoopError> {
        (**self).connect(output)
    }
}

impl<I, O, C: Connectable<I, O> + ?Sized> Connectable<I, O> for Box<C> {
    fn connect(&self, output: Consumer<O>) -> Result<Box<dyn Connection<I>>, LoopError> {
        (**self).connect(output)
    }
}

// ============================================================================
// Closure-backed connectable
// ============================================================================

/// Connection built from a pair of closures.
pub struct SimpleConnection<I> {
    accept: Box<dyn Fn(I) + Send + Sync>,
    dispose: Box<dyn Fn() + Send + Sync>,
}

impl<I> SimpleConnection<I> {
    pub fn new(
        accept: impl Fn(I) + Send + Sync + 'static,
        dispose: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            accept: Box::new(accept),
            dispose: Box::new(dispose),
        }
    }
}

impl<I> Connection<I> for SimpleConnection<I> {
    fn accept(&self, input: I) {
        (self.accept)(input);
    }

    fn dispose(&self) {
        (self.dispose)();
    }
}

type ConnectFn<I, O> = dyn Fn(Consumer<O>) -> SimpleConnection<I> + Send + Sync;

/// Connectable whose connections come from a closure, with the
/// single-connection and use-after-dispose discipline enforced for it.
pub struct FnConnectable<I, O> {
    connect: Arc<ConnectFn<I, O>>,
    slot: ConnectionSlot,
    error_hook: ErrorHook,
}

impl<I, O> FnConnectable<I, O> {
    pub fn new(connect: impl Fn(Consumer<O>) -> SimpleConnection<I> + Send + Sync + 'static) -> Self {
        Self {
            connect: Arc::new(connect),
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

impl<I: Send + 'static, O: 'static> Connectable<I, O> for FnConnectable<I, O> {
    fn connect(&self, output: Consumer<O>) -> Result<Box<dyn Connection<I>>, LoopError> {
        let lease = self.slot.acquire()?;
        let connection = (self.connect)(output);
        Ok(Box::new(GuardedConnection::new(
            Box::new(connection),
            Some(lease),
            self.error_hook.clone(),
        )))
    }
}
