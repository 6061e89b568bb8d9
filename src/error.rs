//! Error taxonomy and the injectable fatal-error hook

use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use thiserror::Error;

/// Configuration and discipline errors raised by the runtime.
///
/// None of these are recoverable runtime conditions: each one signals a
/// programming error in how the loop, its routes, or its connectables
/// were wired together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoopError {
    #[error("{matches} handlers found for effect {effect} (routes: {routes:?})")]
    Routing {
        matches: usize,
        effect: String,
        /// Registration indices of the routes that matched
        routes: Vec<usize>,
    },
    #[error("Connectable is already connected; dispose the previous connection first")]
    AlreadyConnected,
    #[error("accept() called on a disposed connection")]
    UseAfterDispose,
    #[error("Loop is already running")]
    AlreadyRunning,
    #[error("Loop is not running")]
    NotRunning,
    #[error("A view is already connected")]
    ViewAlreadyConnected,
    #[error("No view is connected")]
    NoViewConnected,
    #[error("Cannot connect or disconnect a view while the loop is running")]
    ViewChangeWhileRunning,
}

impl LoopError {
    pub fn routing(matches: usize, effect: &impl fmt::Debug, routes: Vec<usize>) -> Self {
        Self::Routing {
            matches,
            effect: format!("{effect:?}"),
            routes,
        }
    }
}

type HookFn = dyn Fn(LoopError, &'static Location<'static>) + Send + Sync;

/// Receiver for fatal errors found on paths that cannot return a `Result`.
///
/// Threaded explicitly into routers and connectables. The default aborts
/// the process; tests install a recording hook instead.
#[derive(Clone)]
pub struct ErrorHook {
    handler: Arc<HookFn>,
}

impl ErrorHook {
    pub fn new(handler: impl Fn(LoopError, &'static Location<'static>) + Send + Sync + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Fail fast: log and abort the process.
    pub fn aborting() -> Self {
        Self::new(|error, location| {
            tracing::error!(error = %error, %location, "Fatal loop error, aborting");
            eprintln!("fatal loop error: {error} ({location})");
            std::process::abort();
        })
    }

    /// Fail soft: log and continue.
    pub fn logging() -> Self {
        Self::new(|error, location| {
            tracing::error!(error = %error, %location, "Loop error");
        })
    }

    #[track_caller]
    pub fn report(&self, error: LoopError) {
        (self.handler)(error, Location::caller());
    }
}

impl Default for ErrorHook {
    fn default() -> Self {
        Self::aborting()
    }
}

impl fmt::Debug for ErrorHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHook").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_routing_message_reports_match_count() {
        let err = LoopError::routing(2, &"A", vec![0, 1]);
        assert!(err.to_string().starts_with("2 handlers found for effect \"A\""));

        let err = LoopError::routing(0, &3, vec![]);
        assert!(err.to_string().starts_with("0 handlers found for effect 3"));
    }

    #[test]
    fn test_custom_hook_receives_error_and_location() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let hook = ErrorHook::new(move |error, location| {
            sink.lock().unwrap().push((error, location.file()));
        });

        hook.report(LoopError::UseAfterDispose);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, LoopError::UseAfterDispose);
        assert!(seen[0].1.ends_with("error.rs"));
    }

    #[test]
    fn test_logging_hook_does_not_panic() {
        ErrorHook::logging().report(LoopError::NotRunning);
    }
}
