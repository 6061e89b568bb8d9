//! Pure state machine types
//!
//! Implements the Elm Architecture vocabulary: an update function maps the
//! current model and one event to a [`Next`], and an initiate function maps
//! the start model to a [`First`].

mod first;
mod logger;
mod next;

pub use first::First;
pub use logger::{LoopLogger, NoopLogger, TracingLogger};
pub use next::Next;

use std::sync::Arc;

/// Pure transition function. Must not panic and must not depend on shared
/// state beyond its arguments.
pub type Update<M, Ev, Ef> = Arc<dyn Fn(&M, &Ev) -> Next<M, Ef> + Send + Sync>;

/// Produces the first model and effects from the start model.
pub type Initiate<M, Ef> = Arc<dyn Fn(M) -> First<M, Ef> + Send + Sync>;
