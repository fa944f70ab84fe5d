//! Workflow orchestration for lockstep

mod changelog;
mod pipeline;

pub use changelog::*;
pub use pipeline::*;
