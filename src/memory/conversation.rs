//! 会话历史
//!
//! 一次会话是按序追加的 Turn 序列（user/assistant 各为一条 Message）；
//! ConversationMemory 保留最近 N 轮，超出时自动剪枝，供 LLM 上下文使用。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致；持久化只存 User/Assistant 两种）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息：会话中的一个 Turn
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// 可持久化的 Turn：user/assistant 且内容非空
    pub fn is_storable(&self) -> bool {
        !matches!(self.role, Role::System) && !self.content.trim().is_empty()
    }
}

/// 短期记忆：最近 N 轮对话（每轮含 user + assistant，故实际保留约 max_turns*2 条消息）
#[derive(Clone, Debug)]
pub struct ConversationMemory {
    messages: Vec<Message>,
    max_turns: usize,
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_turns,
        }
    }

    /// 从持久化快照重建
    pub fn from_messages(messages: Vec<Message>, max_turns: usize) -> Self {
        let mut mem = Self { messages, max_turns };
        mem.prune();
        mem
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
        self.prune();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// 超出 max_turns*2 时丢弃最旧的消息，保留最近部分
    fn prune(&mut self) {
        if self.messages.len() > self.max_turns * 2 {
            let keep = self.max_turns * 2;
            self.messages.drain(..self.messages.len() - keep);
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
