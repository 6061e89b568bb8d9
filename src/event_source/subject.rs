//! Synchronous fan-out event source

use super::EventSource;
use crate::connectable::Consumer;
use crate::disposable::{AnonymousDisposable, Disposable};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Event source driven by explicit `emit()` calls.
///
/// Emits go to whoever is subscribed at that moment, in subscription order;
/// nothing is buffered for later subscribers.
pub struct EventSubject<E> {
    inner: Arc<Mutex<Subscribers<E>>>,
}

struct Subscribers<E> {
    next_id: u64,
    consumers: BTreeMap<u64, Consumer<E>>,
}

impl<E> Clone for EventSubject<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> Default for EventSubject<E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Subscribers {
                next_id: 0,
                consumers: BTreeMap::new(),
            })),
        }
    }
}

impl<E> EventSubject<E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribers(&self) -> MutexGuard<'_, Subscribers<E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().consumers.len()
    }

    pub fn emit(&self, event: E)
    where
        E: Clone,
    {
        let consumers: Vec<Consumer<E>> = self.subscribers().consumers.values().cloned().collect();
        for consumer in consumers {
            consumer(event.clone());
        }
    }
}

impl<E: 'static> EventSource<E> for EventSubject<E> {
    fn subscribe(&self, consumer: Consumer<E>) -> Box<dyn Disposable> {
        let id = {
            let mut subscribers = self.subscribers();
            let id = subscribers.next_id;
            subscribers.next_id += 1;
            subscribers.consumers.insert(id, consumer);
            id
        };

        let inner = Arc::downgrade(&self.inner);
        Box::new(AnonymousDisposable::new(move || {
            if let Some(inner) = inner.upgrade() {
                let removed = inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .consumers
                    .remove(&id);
                drop(removed);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingConsumer;

    #[test]
    fn test_emit_reaches_current_subscribers_only() {
        let subject = EventSubject::new();
        let early = RecordingConsumer::new();
        let late = RecordingConsumer::new();

        subject.emit("before");
        let first = subject.subscribe(early.consumer());
        subject.emit("x");
        let _second = subject.subscribe(late.consumer());
        subject.emit("y");
        first.dispose();
        subject.emit("z");

        assert_eq!(early.values(), vec!["x", "y"]);
        assert_eq!(late.values(), vec!["y", "z"]);
        assert_eq!(subject.subscriber_count(), 1);
    }

    #[test]
    fn test_dispose_after_subject_dropped() {
        let subject = EventSubject::<i32>::new();
        let subscription = subject.subscribe(RecordingConsumer::new().consumer());
        drop(subject);
        subscription.dispose();
    }
}
