//! The Coordinator graph: recall memory, route to domain subgraphs, run
//! them, collect approvals, finalize the response (spec §4.6).

pub mod engine;
pub mod state;

pub use engine::{Coordinator, Subgraphs};
pub use state::{CoordinatorState, TurnInput, TurnOutcome};
