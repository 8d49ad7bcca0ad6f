//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `PLUME__*` 覆盖（双下划线表示嵌套，如 `PLUME__LLM__MODEL=mistral-small-latest`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub mail: MailSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub web: WebSection,
}

/// [app] 段：应用名、产物工作区、对话轮数上限
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// 产物与会话存储根目录，未设置时用 ./workspace
    pub workspace_root: Option<PathBuf>,
    /// 对话历史保留轮数（短期记忆）
    #[serde(default = "default_max_context_turns")]
    pub max_context_turns: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            workspace_root: None,
            max_context_turns: default_max_context_turns(),
        }
    }
}

fn default_max_context_turns() -> usize {
    20
}

/// [llm] 段：OpenAI 兼容端点与模型
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：mistral / openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// 兼容端点，未设置时按 provider 取默认（mistral -> api.mistral.ai/v1）
    pub base_url: Option<String>,
    /// 读取 API Key 的环境变量名
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key_env: default_llm_api_key_env(),
        }
    }
}

fn default_provider() -> String {
    "mistral".to_string()
}

fn default_model() -> String {
    "mistral-large-latest".to_string()
}

fn default_llm_api_key_env() -> String {
    "MISTRAL_API_KEY".to_string()
}

/// [mail] 段：事务邮件提供商（Brevo 兼容 HTTP API）
#[derive(Debug, Clone, Deserialize)]
pub struct MailSection {
    /// 提供商 API 根地址
    #[serde(default = "default_mail_api_base")]
    pub api_base: String,
    /// 读取提供商 API Key 的环境变量名；变量缺失视为未配置
    #[serde(default = "default_mail_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_sender_email")]
    pub sender_email: String,
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
}

impl Default for MailSection {
    fn default() -> Self {
        Self {
            api_base: default_mail_api_base(),
            api_key_env: default_mail_api_key_env(),
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
        }
    }
}

fn default_mail_api_base() -> String {
    "https://api.brevo.com/v3".to_string()
}

fn default_mail_api_key_env() -> String {
    "BREVO_API_KEY".to_string()
}

fn default_sender_email() -> String {
    "no-reply@plume-agent.com".to_string()
}

fn default_sender_name() -> String {
    "Plume".to_string()
}

/// [agent] 段：循环步数预算与工具超时
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    /// 单轮对话的 Plan/Act 步数上限
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

fn default_max_steps() -> usize {
    5
}

fn default_tool_timeout_secs() -> u64 {
    30
}

/// [web] 段：HTTP 边界
#[derive(Debug, Clone, Deserialize)]
pub struct WebSection {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            llm: LlmSection::default(),
            mail: MailSection::default(),
            agent: AgentSection::default(),
            web: WebSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 PLUME__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 PLUME__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("PLUME")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.agent.max_steps, 5);
        assert_eq!(cfg.llm.provider, "mistral");
        assert_eq!(cfg.mail.api_key_env, "BREVO_API_KEY");
        assert_eq!(cfg.app.max_context_turns, 20);
    }
}
