// htpipe/src/pipeline/mod.rs

//! Defines `HandlerDescription`, its compilation from transforms, capability
//! checking, and execution logic.

pub mod capabilities;
pub mod compiler;
pub mod definition;
pub mod execution;
pub mod hooks;
pub mod lifecycle;

pub use compiler::{ht_pipe, Transform};
pub use definition::HandlerDescription;
pub use lifecycle::{map_failure, Interrupt, LifecycleState};
