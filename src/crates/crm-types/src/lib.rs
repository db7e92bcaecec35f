//! Shared data model for the CRM Coordinator runtime.
//!
//! Every other crate in the workspace depends on this one and nothing else
//! depends on it, mirroring how `langgraph-checkpoint`'s own data types
//! (`Checkpoint`, `CheckpointConfig`) are kept free of I/O so they can sit
//! at the bottom of the dependency graph.

pub mod approval;
pub mod credential;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod interrupt;
pub mod memory;
pub mod plan;
pub mod thread;

pub use approval::{ApprovalDecision, ApprovalRequest, Decision, PendingApproval};
pub use credential::{Credential, REFRESH_THRESHOLD};
pub use domain::Domain;
pub use envelope::{Envelope, ErrorClass, ToolError};
pub use error::{CrmError, Result};
pub use interrupt::{InterruptPayload, InterruptType, PendingInterrupt};
pub use memory::{MemoryContext, MemoryItem};
pub use plan::{EntityCategory, ExecutionPlan, ExtractedEntity, PlanAnalysis, PlanMetadata, SequentialStep};
pub use thread::ThreadRef;
