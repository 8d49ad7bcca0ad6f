//! Agent 错误类型与失败类别
//!
//! AgentError 是封闭的错误集合，kind() 映射到四个失败类别：
//! 校验（Validation）、外部依赖（Dependency）、步数预算（Budget）、持久化（Persistence）。
//! 边界层据此决定诊断文案，而不是去匹配错误字符串。

use thiserror::Error;

/// Agent 运行过程中可能出现的错误（输入校验、LLM、工具、路径逃逸、持久化等）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Path escape attempt: {0}")]
    PathEscape(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    /// 循环用尽步数仍未得到最终回复；partial 为最后一次模型输出，供上层拼“尽力而为”的部分回答
    #[error("Step budget exhausted after {steps} steps")]
    BudgetExhausted { steps: usize, partial: String },

    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// 失败类别：校验 / 依赖 / 预算 / 持久化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Dependency,
    Budget,
    Persistence,
}

impl AgentError {
    /// 错误所属的失败类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentError::InvalidInput(_) | AgentError::PathEscape(_) => ErrorKind::Validation,
            AgentError::LlmError(_)
            | AgentError::ToolExecutionFailed(_)
            | AgentError::ToolTimeout(_)
            | AgentError::ConfigError(_) => ErrorKind::Dependency,
            AgentError::BudgetExhausted { .. } => ErrorKind::Budget,
            AgentError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}
