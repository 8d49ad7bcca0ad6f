//! 按会话持久化
//!
//! 每个 session_id 对应 workspace/sessions/ 下一个 JSON 快照文件；
//! load 在文件缺失或损坏时退化为空历史（绝不向上抛致命错误），
//! save 为整体覆写（非追加格式），UTF-8 无损编码任意用户文本。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::memory::Message;

/// 会话快照：持久化对话消息与最近保存时间，重启后恢复
#[derive(Debug, Serialize, Deserialize)]
struct SessionSnapshot {
    messages: Vec<Message>,
    /// 最近一次保存时间（RFC 3339），仅供人工排查
    #[serde(default)]
    saved_at: String,
}

/// 文件型会话存储：session_id -> sessions/{safe_id}.json
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions_dir: PathBuf,
}

impl SessionStore {
    /// 在 workspace 下创建 sessions 目录
    pub fn new(workspace: &Path) -> Result<Self, AgentError> {
        let sessions_dir = workspace.join("sessions");
        std::fs::create_dir_all(&sessions_dir)
            .map_err(|e| AgentError::Persistence(format!("create sessions dir: {}", e)))?;
        Ok(Self { sessions_dir })
    }

    /// 会话在磁盘上的路径：非字母数字字符替换为 _，防止 id 作为路径分量逃逸
    fn session_path(&self, session_id: &str) -> PathBuf {
        let safe_id: String = session_id
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let stem = if safe_id.is_empty() {
            "default".to_string()
        } else {
            safe_id
        };
        self.sessions_dir.join(format!("{}.json", stem))
    }

    /// 加载会话历史；文件缺失返回空序列，内容损坏记 warn 后同样返回空序列
    pub fn load(&self, session_id: &str) -> Vec<Message> {
        let path = self.session_path(session_id);
        let data = match std::fs::read_to_string(&path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "session log unreadable, starting fresh");
                return Vec::new();
            }
        };
        match serde_json::from_str::<SessionSnapshot>(&data) {
            Ok(snap) => snap.messages,
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "session log corrupted, starting fresh");
                Vec::new()
            }
        }
    }

    /// 整体覆写会话历史；只落盘非空的 user/assistant Turn。
    /// 已知限制：同一会话的并发轮次在此处竞态，结果为 last-write-wins（不做跨请求加锁）。
    pub fn save(&self, session_id: &str, messages: &[Message]) -> Result<(), AgentError> {
        let snap = SessionSnapshot {
            messages: messages.iter().filter(|m| m.is_storable()).cloned().collect(),
            saved_at: chrono::Local::now().to_rfc3339(),
        };
        let json = serde_json::to_string_pretty(&snap)
            .map_err(|e| AgentError::Persistence(format!("encode session: {}", e)))?;
        std::fs::write(self.session_path(session_id), json)
            .map_err(|e| AgentError::Persistence(format!("write session: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Role;

    #[test]
    fn test_load_missing_session_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        assert!(store.load("never-saved").is_empty());
    }

    #[test]
    fn test_roundtrip_preserves_non_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        let history = vec![
            Message::user("Bonjour, ça va ? 你好 🌍"),
            Message::assistant("Très bien — et vous ?"),
        ];
        store.save("s1", &history).unwrap();
        let loaded = store.load("s1");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].content, "Bonjour, ça va ? 你好 🌍");
        assert_eq!(loaded[1].content, "Très bien — et vous ?");
        assert_eq!(loaded[0].role, Role::User);
    }

    #[test]
    fn test_corrupted_log_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("sessions/bad.json"), "{not json at all").unwrap();
        assert!(store.load("bad").is_empty());
    }

    #[test]
    fn test_save_overwrites_whole_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        store.save("s", &[Message::user("a"), Message::assistant("b")]).unwrap();
        store.save("s", &[Message::user("only")]).unwrap();
        let loaded = store.load("s");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].content, "only");
    }

    #[test]
    fn test_session_id_sanitized_as_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        store.save("../../etc/passwd", &[Message::user("x")]).unwrap();
        // 写入落在 sessions/ 下，而不是逃逸到外部
        let loaded = store.load("../../etc/passwd");
        assert_eq!(loaded.len(), 1);
        assert!(dir.path().join("sessions").join("______etc_passwd.json").exists());
    }

    #[test]
    fn test_empty_and_system_turns_not_stored() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        store
            .save(
                "s",
                &[
                    Message::system("policy"),
                    Message::user("bonjour"),
                    Message::assistant("   "),
                ],
            )
            .unwrap();
        let loaded = store.load("s");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].content, "bonjour");
    }
}
