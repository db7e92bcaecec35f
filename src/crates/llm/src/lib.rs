//! LLM provider implementation for the Coordinator's scoped chat calls.
//!
//! The Coordinator only reaches for an LLM in one place: the contact
//! subgraph's name-extraction/disambiguation step (spec.md §4.5.1), which is
//! optional and only runs when `OPENAI_API_KEY` is configured. That keeps
//! this crate down to a single remote provider rather than the full
//! local/remote matrix a general-purpose LLM SDK would carry.
//!
//! ```rust,ignore
//! use llm::remote::OpenAiClient;
//! use llm::config::RemoteLlmConfig;
//! use langgraph_core::llm::{ChatModel, ChatRequest};
//! use langgraph_core::Message;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RemoteLlmConfig::new("sk-...", "https://api.openai.com/v1", "gpt-4o-mini");
//!     let client = OpenAiClient::new(config);
//!
//!     let request = ChatRequest::new(vec![Message::human("Extract the contact name")]);
//!     let response = client.chat(request).await?;
//!     println!("Response: {}", response.message.text().unwrap());
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod provider_utils;

#[macro_use]
mod provider_macros;

pub mod remote;

// Re-export commonly used types
pub use config::{LocalLlmConfig, RemoteLlmConfig};
pub use error::{LlmError, Result};
pub use provider_utils::{ModelInfo, ProviderUtils};

// Re-export langgraph-core types for convenience
pub use langgraph_core::llm::{
    ChatConfig, ChatModel, ChatRequest, ChatResponse, ChatStreamResponse, ReasoningContent,
    ReasoningMode, ToolCall, ToolDefinition, ToolResult, UsageMetadata,
};
pub use langgraph_core::Message;

