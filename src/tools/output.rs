//! 双通道结果类型
//!
//! 工具结果同时携带人类可读消息与可选的产物文件引用。文本通道上的约定是
//! `"<message>||<file reference>"`（无产物时只有 message）；编码与解析都
//! 收敛在 ToolOutput 一处，其余代码只接触带标签的结构体。

use serde::{Deserialize, Serialize};

/// 文本通道上的产物分隔符：两个竖线，正常行文中不会出现
pub const ARTIFACT_DELIMITER: &str = "||";

/// 工具调用结果：恰为「成功消息 + 文件引用」或「失败/纯文本消息，无引用」之一
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub message: String,
    pub artifact: Option<String>,
}

impl ToolOutput {
    /// 纯消息（无产物；失败消息也走这里）
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            artifact: None,
        }
    }

    /// 消息 + 产物文件引用
    pub fn with_artifact(message: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            artifact: Some(artifact.into()),
        }
    }

    /// 编码到文本通道：有产物时拼接分隔符
    pub fn encode(&self) -> String {
        match &self.artifact {
            Some(artifact) => format!("{}{}{}", self.message, ARTIFACT_DELIMITER, artifact),
            None => self.message.clone(),
        }
    }

    /// 从原始文本解析：按首个分隔符切分并去除两侧空白；无分隔符则整体为消息。
    /// 分隔符后为空白时视为无产物。
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(ARTIFACT_DELIMITER) {
            Some((message, artifact)) => {
                let artifact = artifact.trim();
                if artifact.is_empty() {
                    Self::message(message.trim())
                } else {
                    Self::with_artifact(message.trim(), artifact)
                }
            }
            None => Self::message(raw.trim()),
        }
    }
}
