//! Effect handler capability and the stock handler shapes

use super::EffectCallback;
use crate::disposable::{Disposable, NoopDisposable};
use std::future::Future;
use tokio::runtime::Handle;

/// Performs one effect payload.
///
/// Outputs and completion go through the callback; the returned handle
/// cancels the work if the executor is disposed before it ends.
pub trait EffectHandler<P, E>: Send + Sync {
    fn handle(&self, payload: P, callback: EffectCallback<E>) -> Box<dyn Disposable>;
}

impl<P, E, F, D> EffectHandler<P, E> for F
where
    F: Fn(P, EffectCallback<E>) -> D + Send + Sync,
    D: Disposable + 'static,
{
    fn handle(&self, payload: P, callback: EffectCallback<E>) -> Box<dyn Disposable> {
        Box::new(self(payload, callback))
    }
}

/// Runs a function for its side effect and ends immediately.
pub struct SideEffectHandler<F>(pub F);

impl<P, E, F> EffectHandler<P, E> for SideEffectHandler<F>
where
    F: Fn(P) + Send + Sync,
{
    fn handle(&self, payload: P, callback: EffectCallback<E>) -> Box<dyn Disposable> {
        (self.0)(payload);
        callback.end();
        Box::new(NoopDisposable)
    }
}

/// Maps the payload to zero or more events, then ends.
pub struct EventsHandler<F>(pub F);

impl<P, E, F, I> EffectHandler<P, E> for EventsHandler<F>
where
    F: Fn(P) -> I + Send + Sync,
    I: IntoIterator<Item = E>,
{
    fn handle(&self, payload: P, callback: EffectCallback<E>) -> Box<dyn Disposable> {
        callback.end_with((self.0)(payload));
        Box::new(NoopDisposable)
    }
}

/// Runs an async function on a tokio runtime and ends with its events.
///
/// Cancellation aborts the task; the callback it owned is dropped with it
/// and ends implicitly.
pub struct AsyncHandler<F> {
    runtime: Handle,
    f: F,
}

impl<F> AsyncHandler<F> {
    pub fn new(runtime: Handle, f: F) -> Self {
        Self { runtime, f }
    }
}

impl<P, E, F, Fut, I> EffectHandler<P, E> for AsyncHandler<F>
where
    F: Fn(P) -> Fut + Send + Sync,
    Fut: Future<Output = I> + Send + 'static,
    I: IntoIterator<Item = E>,
    E: 'static,
{
    fn handle(&self, payload: P, callback: EffectCallback<E>) -> Box<dyn Disposable> {
        let future = (self.f)(payload);
        let task = self.runtime.spawn(async move {
            let outputs = future.await;
            callback.end_with(outputs);
        });
        Box::new(task.abort_handle())
    }
}
