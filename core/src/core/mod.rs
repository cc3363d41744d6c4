pub mod context;
pub mod gate;
pub mod input;
pub mod outcome;
pub mod stage;

// Re-export key types for easier access from other modules (and lib.rs)
pub use context::Context;
pub use gate::Gate;
pub use input::{SeedInput, UnsafeInput};
pub use outcome::{Outcome, Response, ResponseSink, WireResponse};
pub use stage::{Role, Stage};
