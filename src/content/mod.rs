//! Generated explanatory content per concept

pub mod llm;
pub mod prompt;
pub mod provider;

pub use llm::{LlmClient, ProviderConfig, TextGenerator};
pub use provider::{Content, ContentKey, ContentProvider};
