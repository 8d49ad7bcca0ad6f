//! 无头 Agent 运行时
//!
//! 供 HTTP 边界调用：create_agent_components 在进程启动时构建一次
//! Planner / ToolExecutor / 策略指令（显式依赖注入，多会话共享、不持会话状态），
//! process_message 对单条用户输入完成「加载历史 -> 门禁 -> 有界循环 -> 解析
//! 双通道结果 -> 追加并持久化历史」的完整一轮。

use std::path::Path;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{AgentError, ErrorKind};
use crate::gate::{self, PolicyInstructions};
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};
use crate::memory::{ConversationMemory, Message, SessionStore};
use crate::react::{react_loop, Planner, ToolInvocation};
use crate::tools::{
    BuildExcelTool, BuildPdfTool, BuildWordTool, SendMailTool, ToolExecutor, ToolRegistry,
};

/// 预构建的 Agent 组件：Planner、ToolExecutor、策略指令，多会话共享
pub struct AgentComponents {
    pub planner: Planner,
    pub executor: ToolExecutor,
    pub policy: PolicyInstructions,
    /// 单轮 Plan/Act 步数预算
    pub max_steps: usize,
}

/// 一轮对话的结果：回复文本、可选产物引用与工具调用轨迹
#[derive(Debug)]
pub struct AgentReply {
    pub text: String,
    pub artifact: Option<String>,
    pub invocations: Vec<ToolInvocation>,
}

/// 按配置创建 LLM 客户端（mock / OpenAI 兼容端点）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    if cfg.llm.provider == "mock" {
        return Arc::new(MockLlmClient);
    }
    let base_url = cfg.llm.base_url.clone().or_else(|| {
        (cfg.llm.provider == "mistral").then(|| "https://api.mistral.ai/v1".to_string())
    });
    let api_key = std::env::var(&cfg.llm.api_key_env).ok();
    Arc::new(OpenAiClient::new(
        base_url.as_deref(),
        &cfg.llm.model,
        api_key.as_deref(),
    ))
}

/// 创建 Agent 组件：LLM、四个能力工具（word / pdf / excel / mail）、策略指令与系统提示
pub fn create_agent_components(cfg: &AppConfig, workspace: &Path) -> AgentComponents {
    let llm = create_llm_from_config(cfg);

    let mut tools = ToolRegistry::new();
    tools.register(BuildWordTool::new(workspace));
    tools.register(BuildPdfTool::new(workspace));
    tools.register(BuildExcelTool::new(workspace));
    tools.register(SendMailTool::new(cfg.mail.clone(), workspace));

    let policy = PolicyInstructions::default();
    let system_prompt = build_system_prompt(&tools, &policy);
    let executor = ToolExecutor::new(tools, cfg.agent.tool_timeout_secs);

    AgentComponents {
        planner: Planner::new(llm, system_prompt),
        executor,
        policy,
        max_steps: cfg.agent.max_steps,
    }
}

/// 组装系统提示：常驻策略 + Available tools + 工具调用 JSON Schema + 双通道约定
fn build_system_prompt(tools: &ToolRegistry, policy: &PolicyInstructions) -> String {
    let mut descriptions = tools.tool_descriptions();
    descriptions.sort();
    let tool_list = descriptions
        .iter()
        .map(|(name, desc)| format!("- {}: {}", name, desc))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{}\n\nAvailable tools:\n{}\n\n\
         ## Tool call JSON Schema (you must output valid JSON matching this)\n```json\n{}\n```\n\n\
         To call a tool, output ONLY one JSON object {{\"tool\": \"name\", \"args\": {{...}}}}. \
         Otherwise answer in plain text. \
         When a tool result contains the marker '||', repeat that full result string unchanged \
         at the end of your final answer so the caller can locate the generated file.",
        policy.standing,
        tool_list,
        tools.to_schema_json()
    )
}

/// 处理单条用户消息：完整一轮（门禁 -> 循环 -> 双通道解析 -> 持久化）。
/// 任何失败都折叠为带诊断文案的正常回复，绝不向边界抛致命错误。
pub async fn process_message(
    components: &AgentComponents,
    store: &SessionStore,
    session_id: &str,
    user_input: &str,
    max_context_turns: usize,
) -> AgentReply {
    let mut history = store.load(session_id);
    let decision = gate::classify(user_input);
    tracing::info!(
        session_id = %session_id,
        actions_authorized = decision.actions_authorized,
        matched = decision.matched.as_deref().unwrap_or("-"),
        "turn gate decision"
    );

    // 工作副本：含历史与本轮的中间 Observation；持久化只追加干净的 user/assistant Turn
    let mut context = ConversationMemory::from_messages(history.clone(), max_context_turns);

    let (raw, invocations) = match react_loop(
        &components.planner,
        &components.executor,
        &decision,
        &components.policy,
        &mut context,
        user_input,
        components.max_steps,
    )
    .await
    {
        Ok(result) => (result.response, result.invocations),
        Err(AgentError::BudgetExhausted { steps, partial }) => {
            tracing::warn!(session_id = %session_id, steps, "step budget exhausted");
            let text = if partial.trim().is_empty() {
                format!(
                    "Je n'ai pas pu conclure en {} étapes. Pouvez-vous reformuler votre demande ?",
                    steps
                )
            } else {
                format!(
                    "Limite de {} étapes atteinte. Dernière sortie du modèle :\n{}",
                    steps, partial
                )
            };
            (text, Vec::new())
        }
        Err(e) => {
            tracing::error!(session_id = %session_id, error = %e, kind = ?e.kind(), "turn failed");
            (diagnostic_answer(&e), Vec::new())
        }
    };

    // 双通道解析：raw 切成 {text, artifact}
    let parsed = crate::tools::ToolOutput::parse(&raw);

    history.push(Message::user(user_input));
    history.push(Message::assistant(parsed.message.clone()));
    if let Err(e) = store.save(session_id, &history) {
        // 持久化退化不影响本轮回复
        tracing::warn!(session_id = %session_id, error = %e, "session save failed");
    }

    AgentReply {
        text: parsed.message,
        artifact: parsed.artifact,
        invocations,
    }
}

/// 按失败类别生成用户可读诊断
fn diagnostic_answer(e: &AgentError) -> String {
    match e.kind() {
        ErrorKind::Validation => format!("Requête invalide : {}", e),
        ErrorKind::Dependency => format!(
            "Le service est momentanément indisponible, merci de réessayer. ({})",
            e
        ),
        ErrorKind::Budget => format!("Limite d'étapes atteinte. ({})", e),
        ErrorKind::Persistence => format!(
            "Votre message a été traité mais l'historique n'a pas pu être enregistré. ({})",
            e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;
    use crate::tools::EchoTool;

    fn components_with_script(outputs: Vec<&str>, workspace: &Path) -> AgentComponents {
        let cfg = AppConfig::default();
        let mut tools = ToolRegistry::new();
        tools.register(BuildWordTool::new(workspace));
        tools.register(BuildPdfTool::new(workspace));
        tools.register(BuildExcelTool::new(workspace));
        tools.register(EchoTool);
        let policy = PolicyInstructions::default();
        let system_prompt = build_system_prompt(&tools, &policy);
        AgentComponents {
            planner: Planner::new(Arc::new(ScriptedLlmClient::new(outputs)), system_prompt),
            executor: ToolExecutor::new(tools, cfg.agent.tool_timeout_secs),
            policy,
            max_steps: cfg.agent.max_steps,
        }
    }

    #[tokio::test]
    async fn test_conversation_turn_persists_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        let components = components_with_script(vec!["Très bien, merci !"], dir.path());
        let reply = process_message(&components, &store, "s1", "Bonjour, comment vas-tu ?", 20).await;
        assert_eq!(reply.text, "Très bien, merci !");
        assert!(reply.artifact.is_none());
        assert!(reply.invocations.is_empty());

        let history = store.load("s1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "Bonjour, comment vas-tu ?");
    }

    #[tokio::test]
    async fn test_action_turn_produces_artifact_reference() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        let components = components_with_script(
            vec![
                r#"{"tool": "build_pdf", "args": {"name": "rapport", "title": "X", "content": "Y"}}"#,
                "PDF 'rapport.pdf' généré avec succès||rapport.pdf",
            ],
            dir.path(),
        );
        let reply = process_message(
            &components,
            &store,
            "s2",
            "Génère un PDF nommé rapport avec le titre X et le contenu Y",
            20,
        )
        .await;
        assert_eq!(reply.artifact.as_deref(), Some("rapport.pdf"));
        assert_eq!(reply.invocations.len(), 1);
        assert!(dir.path().join("rapport.pdf").exists());
        // 持久化的 assistant Turn 是干净文本（分隔符之前的部分）
        let history = store.load("s2");
        assert_eq!(history[1].content, "PDF 'rapport.pdf' généré avec succès");
    }

    #[tokio::test]
    async fn test_budget_exhaustion_is_partial_answer_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        let script: Vec<&str> = vec![
            r#"{"tool": "echo", "args": {"text": "a"}}"#;
            10
        ];
        let components = components_with_script(script, dir.path());
        let reply = process_message(&components, &store, "s3", "crée quelque chose en boucle", 20).await;
        assert!(reply.text.contains("Limite de"));
        assert!(reply.artifact.is_none());
    }
}
