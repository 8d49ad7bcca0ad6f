//! LLM 客户端抽象与实现

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::LlmClient;
