//! Event sources
//!
//! External producers of events. A loop subscribes each of its sources
//! once it has a first model and disposes the subscriptions when it stops,
//! so nothing a source emits before start reaches the update function.

mod stream;
mod subject;

pub use stream::StreamEventSource;
pub use subject::EventSubject;

use crate::connectable::Consumer;
use crate::disposable::{CompositeDisposable, Disposable};
use std::marker::PhantomData;
use std::sync::Arc;

pub trait EventSource<E>: Send + Sync {
    /// Start delivering events to `consumer` until the returned handle is disposed.
    fn subscribe(&self, consumer: Consumer<E>) -> Box<dyn Disposable>;
}

impl<E, S: EventSource<E> + ?Sized> EventSource<E> for Arc<S> {
    fn subscribe(&self, consumer: Consumer<E>) -> Box<dyn Disposable> {
        (**self).subscribe(consumer)
    }
}

impl<E, S: EventSource<E> + ?Sized> EventSource<E> for Box<S> {
    fn subscribe(&self, consumer: Consumer<E>) -> Box<dyn Disposable> {
        (**self).subscribe(consumer)
    }
}

/// Several sources forwarding to the same consumer.
pub struct CompositeEventSource<E> {
    sources: Vec<Box<dyn EventSource<E>>>,
}

impl<E> CompositeEventSource<E> {
    pub fn new(sources: Vec<Box<dyn EventSource<E>>>) -> Self {
        Self { sources }
    }
}

impl<E> EventSource<E> for CompositeEventSource<E> {
    fn subscribe(&self, consumer: Consumer<E>) -> Box<dyn Disposable> {
        let subscriptions = self
            .sources
            .iter()
            .map(|source| source.subscribe(consumer.clone()))
            .collect();
        Box::new(CompositeDisposable::new(subscriptions))
    }
}

pub trait EventSourceExt<E>: EventSource<E> + Sized {
    /// Convert every event before it reaches the consumer.
    fn map<E2, F>(self, f: F) -> MapEventSource<Self, F, E>
    where
        F: Fn(E) -> E2 + Send + Sync + 'static,
    {
        MapEventSource {
            inner: self,
            f: Arc::new(f),
            _event: PhantomData,
        }
    }
}

impl<E, S: EventSource<E>> EventSourceExt<E> for S {}

pub struct MapEventSource<S, F, E> {
    inner: S,
    f: Arc<F>,
    _event: PhantomData<fn(E)>,
}

impl<E, E2, S, F> EventSource<E2> for MapEventSource<S, F, E>
where
    S: EventSource<E>,
    F: Fn(E) -> E2 + Send + Sync + 'static,
    E: 'static,
    E2: 'static,
{
    fn subscribe(&self, consumer: Consumer<E2>) -> Box<dyn Disposable> {
        let f = self.f.clone();
        self.inner.subscribe(Arc::new(move |event: E| consumer(f(event))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingConsumer;

    #[test]
    fn test_composite_forwards_every_source() {
        let numbers = EventSubject::<i32>::new();
        let words = EventSubject::<&'static str>::new();
        let sources: Vec<Box<dyn EventSource<String>>> = vec![
            Box::new(numbers.clone().map(|n: i32| n.to_string())),
            Box::new(words.clone().map(|w: &'static str| w.to_uppercase())),
        ];
        let source = CompositeEventSource::new(sources);
        let seen = RecordingConsumer::new();

        let subscription = source.subscribe(seen.consumer());
        numbers.emit(1);
        words.emit("two");
        subscription.dispose();
        numbers.emit(3);

        assert_eq!(seen.values(), vec!["1".to_string(), "TWO".to_string()]);
        assert_eq!(numbers.subscriber_count(), 0);
        assert_eq!(words.subscriber_count(), 0);
    }
}
