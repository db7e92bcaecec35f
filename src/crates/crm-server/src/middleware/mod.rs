//! CORS and request logging, grounded in the teacher's
//! `orchestrator::api::middleware::{cors, logging}`.

mod cors;
mod logging;

pub use cors::cors_layer;
pub use logging::logging_layer;
