//! Loop runtime
//!
//! Drives events through the update function one at a time, publishes
//! models to observers and hands effects to the effect connectable.

mod builder;
mod controller;
mod event_loop;
mod observers;
mod sink;

#[cfg(test)]
mod proptests;

pub use builder::{loop_builder, LoopBuilder};
pub use controller::LoopController;
pub use event_loop::Loop;
pub use observers::ObserverId;
