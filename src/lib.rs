//! Loop runtime - unidirectional state management
//!
//! A loop owns a model and a pure update function. Events go in one at a
//! time, every new model is published to observers, and the effects the
//! update asks for are routed to exactly one handler each. Handlers feed
//! their results back in as events.
//!
//! ```no_run
//! use loop_runtime::effect::EffectRouter;
//! use loop_runtime::runtime::loop_builder;
//! use loop_runtime::state_machine::Next;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Effect {
//!     Log(i64),
//! }
//!
//! let effects = EffectRouter::new()
//!     .route_effects(|effect: &Effect| match effect {
//!         Effect::Log(n) => Some(*n),
//!     })
//!     .to_side_effect(|n| println!("model is {n}"))
//!     .as_connectable();
//!
//! let event_loop = loop_builder(
//!     |model: &i64, delta: &i64| Next::next_with(model + delta, [Effect::Log(model + delta)]),
//!     effects,
//! )
//! .start(0)
//! .unwrap();
//!
//! event_loop.dispatch_event(2);
//! assert_eq!(event_loop.model(), 2);
//! ```

pub mod config;
pub mod connectable;
pub mod disposable;
pub mod effect;
pub mod error;
pub mod event_source;
pub mod runner;
pub mod runtime;
pub mod state_machine;

#[cfg(test)]
mod testing;

pub use config::RuntimeConfig;
pub use connectable::{Connectable, Connection, Consumer};
pub use effect::{EffectCallback, EffectHandler, EffectRouter};
pub use error::{ErrorHook, LoopError};
pub use event_source::EventSource;
pub use runtime::{loop_builder, Loop, LoopBuilder, LoopController};
pub use state_machine::{First, Next};
