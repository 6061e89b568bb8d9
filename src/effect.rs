//! Effect runtime
//!
//! Effects leave the loop through a single connectable, usually an
//! [`EffectRouter`] compiled with `as_connectable()`. Each route owns an
//! [`EffectExecutor`] that tracks every dispatched effect until its
//! [`EffectCallback`] ends, and cancels whatever is left on dispose.

mod callback;
mod executor;
mod handler;
mod router;

#[cfg(test)]
mod proptests;

pub use callback::EffectCallback;
pub(crate) use callback::WeakEffectCallback;
pub use executor::{EffectExecutor, HandlerConnectable};
pub use handler::{AsyncHandler, EffectHandler, EventsHandler, SideEffectHandler};
pub use router::{EffectRouter, PartialRoute, RouterConnectable};
