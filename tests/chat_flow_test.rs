//! 端到端场景测试：门禁、产物生成、邮件配置失败与历史持久化

use std::path::Path;
use std::sync::Arc;

use calamine::{open_workbook, Data, Reader, Xlsx};

use plume::agent::{process_message, AgentComponents};
use plume::config::MailSection;
use plume::gate::PolicyInstructions;
use plume::llm::ScriptedLlmClient;
use plume::memory::SessionStore;
use plume::react::Planner;
use plume::tools::{
    BuildExcelTool, BuildPdfTool, BuildWordTool, SendMailTool, ToolExecutor, ToolRegistry,
    ARTIFACT_DELIMITER,
};
use plume::workspace::{resolve_artifact, ResolvedArtifact};

/// 与生产装配同构的组件，LLM 换成脚本化客户端
fn scripted_components(outputs: Vec<&str>, workspace: &Path) -> AgentComponents {
    let mut tools = ToolRegistry::new();
    tools.register(BuildWordTool::new(workspace));
    tools.register(BuildPdfTool::new(workspace));
    tools.register(BuildExcelTool::new(workspace));
    let mail = MailSection {
        api_key_env: "PLUME_TEST_UNSET_MAIL_KEY".to_string(),
        ..MailSection::default()
    };
    tools.register(SendMailTool::new(mail, workspace));

    AgentComponents {
        planner: Planner::new(
            Arc::new(ScriptedLlmClient::new(outputs)),
            "You are Plume, a test-configured office assistant.",
        ),
        executor: ToolExecutor::new(tools, 10),
        policy: PolicyInstructions::default(),
        max_steps: 5,
    }
}

// 场景 A：纯对话消息，不授权任何动作，回复非空且无产物
#[tokio::test]
async fn scenario_a_conversation_only() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path()).unwrap();
    let components = scripted_components(vec!["Je vais très bien, merci !"], dir.path());

    let reply = process_message(&components, &store, "sess-a", "Bonjour, comment vas-tu ?", 20).await;

    assert!(!reply.text.is_empty());
    assert!(reply.artifact.is_none());
    assert!(reply.invocations.is_empty(), "gated turn must leave no tool trace");
}

// 场景 B：生成 PDF，结果以 rapport.pdf 结尾，边界解析出下载地址
#[tokio::test]
async fn scenario_b_pdf_generation() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path()).unwrap();
    let components = scripted_components(
        vec![
            r#"{"tool": "build_pdf", "args": {"name": "rapport", "title": "X", "content": "Y"}}"#,
            "PDF 'rapport.pdf' généré avec succès||rapport.pdf",
        ],
        dir.path(),
    );

    let reply = process_message(
        &components,
        &store,
        "sess-b",
        "Génère un PDF nommé rapport avec le titre X et le contenu Y",
        20,
    )
    .await;

    assert_eq!(reply.artifact.as_deref(), Some("rapport.pdf"));
    assert_eq!(reply.invocations.len(), 1);
    assert_eq!(reply.invocations[0].tool, "build_pdf");
    assert!(dir.path().join("rapport.pdf").exists());

    match resolve_artifact(dir.path(), "rapport.pdf") {
        ResolvedArtifact::Download { file_url, file_name } => {
            assert!(file_url.ends_with("/mcp/download/rapport.pdf"));
            assert_eq!(file_name, "rapport.pdf");
        }
        other => panic!("expected download url, got {:?}", other),
    }
}

// 场景 C：生成工作簿后重新打开，首行为表头，数据行逐一吻合
#[tokio::test]
async fn scenario_c_workbook_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path()).unwrap();
    let components = scripted_components(
        vec![
            r#"{"tool": "build_excel", "args": {"name": "données", "headers": ["A", "B"], "rows": [[1, 2], [3, 4]]}}"#,
            "Excel 'données.xlsx' généré avec succès !||données.xlsx",
        ],
        dir.path(),
    );

    let reply = process_message(&components, &store, "sess-c", "Crée un tableur données", 20).await;
    assert_eq!(reply.artifact.as_deref(), Some("données.xlsx"));

    let path = dir.path().join("données.xlsx");
    let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
    let sheet = workbook.sheet_names()[0].clone();
    let range = workbook.worksheet_range(&sheet).unwrap();
    assert_eq!(range.get_value((0, 0)), Some(&Data::String("A".into())));
    assert_eq!(range.get_value((0, 1)), Some(&Data::String("B".into())));
    assert_eq!(range.get_value((1, 0)), Some(&Data::Float(1.0)));
    assert_eq!(range.get_value((1, 1)), Some(&Data::Float(2.0)));
    assert_eq!(range.get_value((2, 0)), Some(&Data::Float(3.0)));
    assert_eq!(range.get_value((2, 1)), Some(&Data::Float(4.0)));
}

// 场景 D：无提供商凭证时，邮件工具返回不含分隔符的失败消息
#[tokio::test]
async fn scenario_d_mail_without_credential() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path()).unwrap();
    let components = scripted_components(
        vec![
            r#"{"tool": "send_mail", "args": {"recipient_email": "a@b.fr", "subject": "Test", "message": "Bonjour"}}"#,
            "Erreur : clé API du fournisseur d'email manquante.",
        ],
        dir.path(),
    );

    let reply = process_message(&components, &store, "sess-d", "Envoie un mail à a@b.fr", 20).await;
    assert!(!reply.text.contains(ARTIFACT_DELIMITER));
    assert!(reply.artifact.is_none());
    assert!(reply.text.contains("clé API"));
}

// 受限轮次：即使模型反复输出 Tool Call，调用轨迹依旧为空
#[tokio::test]
async fn gated_turn_suppresses_insistent_tool_calls() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path()).unwrap();
    let components = scripted_components(
        vec![
            r#"{"tool": "build_pdf", "args": {"name": "x", "title": "t", "content": "c"}}"#,
            r#"{"tool": "build_pdf", "args": {"name": "x", "title": "t", "content": "c"}}"#,
            "Je réponds simplement en texte.",
        ],
        dir.path(),
    );

    let reply = process_message(&components, &store, "sess-g", "Raconte-moi ta journée", 20).await;
    assert!(reply.invocations.is_empty());
    assert!(reply.artifact.is_none());
    // 受限模式下不得落盘任何产物
    assert!(!dir.path().join("x.pdf").exists());
}

// 多轮同会话：历史按序累积，重启（新 store 实例）后可恢复
#[tokio::test]
async fn history_accumulates_and_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = SessionStore::new(dir.path()).unwrap();
        let components = scripted_components(vec!["Première réponse."], dir.path());
        process_message(&components, &store, "sess-h", "Premier message", 20).await;
        let components = scripted_components(vec!["Deuxième réponse."], dir.path());
        process_message(&components, &store, "sess-h", "Deuxième message", 20).await;
    }

    // 模拟进程重启：重新打开同一 workspace
    let store = SessionStore::new(dir.path()).unwrap();
    let history = store.load("sess-h");
    let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec![
            "Premier message",
            "Première réponse.",
            "Deuxième message",
            "Deuxième réponse."
        ]
    );
}
