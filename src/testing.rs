//! Test doubles shared by the unit and property tests

use crate::connectable::Consumer;
use crate::disposable::{AnonymousDisposable, Disposable};
use crate::effect::{EffectCallback, EffectHandler};
use crate::error::{ErrorHook, LoopError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Recording Consumer
// ============================================================================

/// Consumer that records every value it receives
pub struct RecordingConsumer<T> {
    values: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for RecordingConsumer<T> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
        }
    }
}

impl<T: Send + 'static> Default for RecordingConsumer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> RecordingConsumer<T> {
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn consumer(&self) -> Consumer<T> {
        let values = self.values.clone();
        Arc::new(move |value| values.lock().unwrap().push(value))
    }

    /// Plain closure form, for APIs taking `impl Fn(T)`
    pub fn observer(&self) -> impl Fn(T) + Send + Sync + 'static {
        let consumer = self.consumer();
        move |value| consumer(value)
    }

    pub fn len(&self) -> usize {
        self.values.lock().unwrap().len()
    }

    /// Block until at least `len` values arrived, or panic after a timeout
    pub fn wait_for_len(&self, len: usize) {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while self.len() < len {
            assert!(Instant::now() < deadline, "timed out waiting for {len} values");
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

impl<T: Clone + Send + 'static> RecordingConsumer<T> {
    pub fn values(&self) -> Vec<T> {
        self.values.lock().unwrap().clone()
    }

    pub async fn wait_for_len_async(&self, len: usize) -> Vec<T> {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while self.len() < len {
            assert!(Instant::now() < deadline, "timed out waiting for {len} values");
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        self.values()
    }
}

// ============================================================================
// Recording Error Hook
// ============================================================================

/// Error hook that records instead of aborting
#[derive(Clone, Default)]
pub struct RecordingErrorHook {
    errors: Arc<Mutex<Vec<LoopError>>>,
}

impl RecordingErrorHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hook(&self) -> ErrorHook {
        let errors = self.errors.clone();
        ErrorHook::new(move |error, _location| errors.lock().unwrap().push(error))
    }

    pub fn errors(&self) -> Vec<LoopError> {
        self.errors.lock().unwrap().clone()
    }
}

// ============================================================================
// Controlled Effect Handler
// ============================================================================

/// Effect handler that never finishes on its own.
///
/// Records payloads and keeps every callback so the test decides when each
/// effect sends, ends, or is abandoned. Counts cancellations.
pub struct ControlledHandler<P, E> {
    state: Arc<Mutex<ControlledState<P, E>>>,
    cancellations: Arc<AtomicUsize>,
}

struct ControlledState<P, E> {
    payloads: Vec<P>,
    callbacks: Vec<Option<EffectCallback<E>>>,
}

impl<P, E> Clone for ControlledHandler<P, E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            cancellations: self.cancellations.clone(),
        }
    }
}

impl<P, E> ControlledHandler<P, E> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ControlledState {
                payloads: Vec::new(),
                callbacks: Vec::new(),
            })),
            cancellations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn payloads(&self) -> Vec<P>
    where
        P: Clone,
    {
        self.state.lock().unwrap().payloads.clone()
    }

    /// Callback of the `index`-th dispatch, if still held
    pub fn held(&self, index: usize) -> Option<EffectCallback<E>> {
        self.state.lock().unwrap().callbacks.get(index).cloned().flatten()
    }

    pub fn callback(&self, index: usize) -> EffectCallback<E> {
        self.held(index).expect("no callback held at index")
    }

    /// Every callback still held
    pub fn callbacks(&self) -> Vec<EffectCallback<E>> {
        self.state.lock().unwrap().callbacks.iter().flatten().cloned().collect()
    }

    /// Drop the held callback without ending it
    pub fn release(&self, index: usize) {
        let released = self
            .state
            .lock()
            .unwrap()
            .callbacks
            .get_mut(index)
            .and_then(Option::take);
        drop(released);
    }

    pub fn cancellations(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }
}

impl<P: Send, E> EffectHandler<P, E> for ControlledHandler<P, E> {
    fn handle(&self, payload: P, callback: EffectCallback<E>) -> Box<dyn Disposable> {
        let mut state = self.state.lock().unwrap();
        state.payloads.push(payload);
        state.callbacks.push(Some(callback));

        let cancellations = self.cancellations.clone();
        Box::new(AnonymousDisposable::new(move || {
            cancellations.fetch_add(1, Ordering::SeqCst);
        }))
    }
}
