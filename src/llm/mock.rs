//! Mock LLM 客户端（用于测试，无需 API）
//!
//! MockLlmClient 取最后一条 User 消息原样回显为纯文本回复；
//! ScriptedLlmClient 按脚本顺序逐条吐出预置输出，便于测多步 Plan/Act 流程。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::Message;

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, crate::memory::Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(format!("Echo from Mock: {}", last_user))
    }
}

/// 脚本化客户端：按顺序返回预置输出，耗尽后返回固定兜底文本
pub struct ScriptedLlmClient {
    outputs: Mutex<VecDeque<String>>,
}

impl ScriptedLlmClient {
    pub fn new(outputs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
        let mut outputs = self.outputs.lock().map_err(|e| e.to_string())?;
        Ok(outputs
            .pop_front()
            .unwrap_or_else(|| "(script exhausted)".to_string()))
    }
}
