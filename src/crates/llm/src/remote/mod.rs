//! Remote LLM provider implementations.
//!
//! This module contains implementations for cloud-hosted LLM APIs. The
//! Coordinator only ever needs one such provider, for the contact subgraph's
//! name-extraction step (spec.md §4.5.1), so only that provider is kept here.

pub mod openai;

pub use openai::OpenAiClient;
