//! LLM integration
//!
//! - [`TextGenerator`]: the seam the analysis orchestrator calls through
//! - [`LlmClient`]: HTTP implementation against the text-generation endpoint
//! - [`CredentialCache`]: bearer token cache with expiry

mod client;
mod credentials;
mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use client::{LlmClient, LlmClientBuilder};
pub use credentials::{CachedToken, CredentialCache};
pub use types::{
    GenerationRequest, Message, MessageRole, TokenRequest, TokenResponse, extract_content,
};

/// Produces text from a system and a user prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String>;
}
