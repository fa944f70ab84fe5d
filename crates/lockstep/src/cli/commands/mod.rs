//! CLI commands

mod graph;
mod plan;
mod publish;
mod shared;

pub use graph::GraphCommand;
pub use plan::PlanCommand;
pub use publish::PublishCommand;
