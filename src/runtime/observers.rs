//! Model observers
//!
//! The registry owns the current model. Every publication and every new
//! registration queues one notification under the same lock, and the loop
//! posts one delivery job per queued notification to the notification
//! runner, so observers see models in exactly the order they were produced.

use crate::connectable::Consumer;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Handle for removing an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

pub(crate) struct ObserverRegistry<M> {
    state: Mutex<RegistryState<M>>,
}

struct RegistryState<M> {
    model: M,
    next_id: u64,
    observers: BTreeMap<ObserverId, Consumer<M>>,
    pending: VecDeque<Notification<M>>,
    closed: bool,
}

struct Notification<M> {
    model: M,
    recipients: Vec<ObserverId>,
}

impl<M: Clone> ObserverRegistry<M> {
    pub(crate) fn new(model: M) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                model,
                next_id: 0,
                observers: BTreeMap::new(),
                pending: VecDeque::new(),
                closed: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, RegistryState<M>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn current(&self) -> M {
        self.state().model.clone()
    }

    /// Replace the model and queue it for every registered observer.
    /// Returns whether a notification was queued.
    pub(crate) fn publish(&self, model: M) -> bool {
        let mut state = self.state();
        state.model = model;
        if state.closed || state.observers.is_empty() {
            return false;
        }
        let notification = Notification {
            model: state.model.clone(),
            recipients: state.observers.keys().copied().collect(),
        };
        state.pending.push_back(notification);
        true
    }

    /// Register an observer and queue the current model for it alone.
    /// Returns `None` once the registry is closed.
    pub(crate) fn add(&self, observer: Consumer<M>) -> Option<ObserverId> {
        let mut state = self.state();
        if state.closed {
            return None;
        }
        let id = ObserverId(state.next_id);
        state.next_id += 1;
        state.observers.insert(id, observer);
        let notification = Notification {
            model: state.model.clone(),
            recipients: vec![id],
        };
        state.pending.push_back(notification);
        Some(id)
    }

    pub(crate) fn remove(&self, id: ObserverId) -> bool {
        let removed = self.state().observers.remove(&id);
        removed.is_some()
    }

    /// Deliver the oldest queued notification to its recipients that are
    /// still registered. Observers run outside the lock.
    pub(crate) fn deliver_next(&self) {
        let (model, observers) = {
            let mut state = self.state();
            let Some(notification) = state.pending.pop_front() else {
                return;
            };
            let observers: Vec<Consumer<M>> = notification
                .recipients
                .iter()
                .filter_map(|id| state.observers.get(id).cloned())
                .collect();
            (notification.model, observers)
        };

        for observer in observers {
            observer(model.clone());
        }
    }

    /// Drop every observer and pending notification; later registrations
    /// are refused. The model stays readable.
    pub(crate) fn close(&self) {
        let (observers, pending) = {
            let mut state = self.state();
            state.closed = true;
            (
                std::mem::take(&mut state.observers),
                std::mem::take(&mut state.pending),
            )
        };
        tracing::debug!(
            observers = observers.len(),
            pending = pending.len(),
            "Observer registry closed"
        );
    }

    #[cfg(test)]
    pub(crate) fn observer_count(&self) -> usize {
        self.state().observers.len()
    }
}
