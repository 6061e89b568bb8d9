//! Start/stop lifecycle around a loop builder
//!
//! The controller remembers the model across restarts and owns the view
//! binding: while running, the view's events go into the loop and every
//! model goes out to the view.

use super::builder::LoopBuilder;
use super::event_loop::Loop;
use super::sink::ConnectionSink;
use crate::connectable::{Connectable, Connection};
use crate::error::LoopError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct LoopController<M, Ev, Ef>
where
    M: Clone + Send + 'static,
    Ev: Send + 'static,
    Ef: Send + 'static,
{
    builder: LoopBuilder<M, Ev, Ef>,
    state: Mutex<ControllerState<M, Ev, Ef>>,
}

struct ControllerState<M, Ev, Ef>
where
    M: Clone + Send + 'static,
    Ev: Send + 'static,
    Ef: Send + 'static,
{
    model: M,
    view: Option<Arc<dyn Connectable<M, Ev>>>,
    phase: Phase<M, Ev, Ef>,
}

enum Phase<M, Ev, Ef>
where
    M: Clone + Send + 'static,
    Ev: Send + 'static,
    Ef: Send + 'static,
{
    Stopped,
    /// `start()` or `stop()` is in progress on some thread
    Transitioning,
    Running(RunningLoop<M, Ev, Ef>),
}

struct RunningLoop<M, Ev, Ef>
where
    M: Clone + Send + 'static,
    Ev: Send + 'static,
    Ef: Send + 'static,
{
    event_loop: Arc<Loop<M, Ev, Ef>>,
    view: Option<Arc<ConnectionSink<M>>>,
}

impl<M, Ev, Ef> ControllerState<M, Ev, Ef>
where
    M: Clone + Send + 'static,
    Ev: Send + 'static,
    Ef: Send + 'static,
{
    fn running_loop(&self) -> Option<Arc<Loop<M, Ev, Ef>>> {
        match &self.phase {
            Phase::Running(running) => Some(running.event_loop.clone()),
            Phase::Stopped | Phase::Transitioning => None,
        }
    }
}

impl<M, Ev, Ef> LoopController<M, Ev, Ef>
where
    M: Clone + Send + 'static,
    Ev: Send + 'static,
    Ef: Send + 'static,
{
    pub(crate) fn new(builder: LoopBuilder<M, Ev, Ef>, model: M) -> Self {
        Self {
            builder,
            state: Mutex::new(ControllerState {
                model,
                view: None,
                phase: Phase::Stopped,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ControllerState<M, Ev, Ef>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind a view. Only allowed while stopped; it is connected on the
    /// next `start()`.
    ///
    /// # Errors
    ///
    /// [`LoopError::ViewChangeWhileRunning`] unless stopped,
    /// [`LoopError::ViewAlreadyConnected`] if a view is already bound.
    pub fn connect_view(&self, view: impl Connectable<M, Ev> + 'static) -> Result<(), LoopError> {
        let mut state = self.state();
        if !matches!(state.phase, Phase::Stopped) {
            return Err(LoopError::ViewChangeWhileRunning);
        }
        if state.view.is_some() {
            return Err(LoopError::ViewAlreadyConnected);
        }
        state.view = Some(Arc::new(view));
        Ok(())
    }

    /// # Errors
    ///
    /// [`LoopError::ViewChangeWhileRunning`] unless stopped,
    /// [`LoopError::NoViewConnected`] if no view is bound.
    pub fn disconnect_view(&self) -> Result<(), LoopError> {
        let mut state = self.state();
        if !matches!(state.phase, Phase::Stopped) {
            return Err(LoopError::ViewChangeWhileRunning);
        }
        if state.view.take().is_none() {
            return Err(LoopError::NoViewConnected);
        }
        Ok(())
    }

    /// Start a loop from the stored model and connect the view to it.
    ///
    /// # Errors
    ///
    /// [`LoopError::AlreadyRunning`] if running or mid-transition, or the
    /// connect error of the effect handler or view.
    pub fn start(&self) -> Result<(), LoopError> {
        let (model, view) = {
            let mut state = self.state();
            if !matches!(state.phase, Phase::Stopped) {
                return Err(LoopError::AlreadyRunning);
            }
            state.phase = Phase::Transitioning;
            (state.model.clone(), state.view.clone())
        };

        // Built without the lock: inline runners may call back in here
        let result = self.launch(model, view);

        let mut state = self.state();
        match result {
            Ok(running) => {
                state.phase = Phase::Running(running);
                tracing::debug!("Loop controller started");
                Ok(())
            }
            Err(err) => {
                state.phase = Phase::Stopped;
                tracing::warn!(error = %err, "Loop controller failed to start");
                Err(err)
            }
        }
    }

    fn launch(
        &self,
        model: M,
        view: Option<Arc<dyn Connectable<M, Ev>>>,
    ) -> Result<RunningLoop<M, Ev, Ef>, LoopError> {
        let event_loop = Arc::new(self.builder.start(model)?);
        let Some(view) = view else {
            return Ok(RunningLoop {
                event_loop,
                view: None,
            });
        };

        let connection: Box<dyn Connection<M>> = view.connect(event_loop.event_consumer())?;
        let sink = Arc::new(ConnectionSink::new(connection));
        let renderer = sink.clone();
        event_loop.add_observer(move |model| {
            renderer.accept(model);
        });
        Ok(RunningLoop {
            event_loop,
            view: Some(sink),
        })
    }

    /// Dispose the loop, keep its last model for the next start, and
    /// disconnect the view.
    ///
    /// # Errors
    ///
    /// [`LoopError::NotRunning`] unless running.
    pub fn stop(&self) -> Result<(), LoopError> {
        let running = {
            let mut state = self.state();
            match std::mem::replace(&mut state.phase, Phase::Transitioning) {
                Phase::Running(running) => running,
                other => {
                    state.phase = other;
                    return Err(LoopError::NotRunning);
                }
            }
        };

        running.event_loop.dispose();
        let model = running.event_loop.model();
        if let Some(view) = &running.view {
            view.close();
        }
        drop(running);

        let mut state = self.state();
        state.model = model;
        state.phase = Phase::Stopped;
        tracing::debug!("Loop controller stopped");
        Ok(())
    }

    /// Forward to the running loop, or replace the stored start model.
    pub fn replace_model(&self, model: M) {
        let event_loop = {
            let mut state = self.state();
            match state.running_loop() {
                Some(event_loop) => event_loop,
                None => {
                    state.model = model;
                    return;
                }
            }
        };
        // Outside the lock: an inline runner notifies the view right here
        event_loop.replace_model(model);
    }

    /// Current model of the running loop, or the stored model when stopped.
    pub fn model(&self) -> M {
        let event_loop = {
            let state = self.state();
            match state.running_loop() {
                Some(event_loop) => event_loop,
                None => return state.model.clone(),
            }
        };
        event_loop.model()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state().phase, Phase::Running(_))
    }
}

impl<M, Ev, Ef> Drop for LoopController<M, Ev, Ef>
where
    M: Clone + Send + 'static,
    Ev: Send + 'static,
    Ef: Send + 'static,
{
    fn drop(&mut self) {
        match self.stop() {
            Ok(()) => tracing::debug!("Loop controller stopped on drop"),
            Err(error) => tracing::debug!(%error, "Loop controller already stopped on drop"),
        }
    }
}
