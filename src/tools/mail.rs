//! send_mail 工具：经 Brevo 兼容事务邮件 API 发送，支持 HTML 与可选附件
//!
//! API Key 从配置指定的环境变量读取，缺失视为配置失败并直接返回失败消息
//! （不发起任何网络调用）。附件按 basename 在 workspace 内解析，读入内存
//! 后 base64 编码随载荷发送；解析不到附件时降级为不带附件发送而非整体失败。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde_json::Value;

use crate::config::MailSection;
use crate::tools::{Tool, ToolOutput};
use crate::workspace::find_by_basename;

/// 事务邮件发送工具
pub struct SendMailTool {
    client: reqwest::Client,
    mail: MailSection,
    workspace: PathBuf,
}

impl SendMailTool {
    pub fn new(mail: MailSection, workspace: impl AsRef<Path>) -> Self {
        Self {
            client: reqwest::Client::new(),
            mail,
            workspace: workspace.as_ref().to_path_buf(),
        }
    }

    /// 按 basename 在 workspace 内解析附件；含路径分隔符或解析失败返回 None（降级）
    fn resolve_attachment(&self, reference: &str) -> Option<PathBuf> {
        let basename = reference.trim();
        if basename.is_empty()
            || basename.contains('/')
            || basename.contains('\\')
            || basename.contains("..")
        {
            tracing::warn!(reference = %reference, "attachment reference refused, sending without it");
            return None;
        }
        let found = find_by_basename(&self.workspace, basename);
        if found.is_none() {
            tracing::info!(reference = %reference, "attachment not found in workspace, sending without it");
        }
        found
    }
}

#[async_trait]
impl Tool for SendMailTool {
    fn name(&self) -> &str {
        "send_mail"
    }

    fn description(&self) -> &str {
        "Send a transactional email, optionally HTML and with one attachment from the workspace. \
         Args: {\"recipient_email\", \"subject\", \"message\", \"is_html\" (optional bool), \
         \"attachment_path\" (optional file name)}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "recipient_email": { "type": "string", "description": "Recipient email address" },
                "subject": { "type": "string", "description": "Email subject" },
                "message": { "type": "string", "description": "Email body (plain text, or HTML when is_html)" },
                "is_html": { "type": "boolean", "description": "Interpret the body as HTML" },
                "attachment_path": { "type": "string", "description": "Name of a workspace file to attach" }
            },
            "required": ["recipient_email", "subject", "message"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let recipient = args
            .get("recipient_email")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        let subject = args.get("subject").and_then(|v| v.as_str()).unwrap_or("").trim();
        let message = args.get("message").and_then(|v| v.as_str()).unwrap_or("");
        let is_html = args.get("is_html").and_then(|v| v.as_bool()).unwrap_or(false);
        let attachment_ref = args.get("attachment_path").and_then(|v| v.as_str());

        for (key, value) in [
            ("recipient_email", recipient.as_str()),
            ("subject", subject),
            ("message", message),
        ] {
            if value.trim().is_empty() {
                return Ok(ToolOutput::message(format!(
                    "Erreur envoi : champ requis manquant ou vide : '{}'",
                    key
                )));
            }
        }

        // 配置失败：不发起网络调用
        let api_key = match std::env::var(&self.mail.api_key_env) {
            Ok(k) if !k.trim().is_empty() => k,
            _ => {
                return Ok(ToolOutput::message(
                    "Erreur : clé API du fournisseur d'email manquante.".to_string(),
                ))
            }
        };

        let mut payload = serde_json::json!({
            "sender": { "email": self.mail.sender_email, "name": self.mail.sender_name },
            "to": [{ "email": recipient }],
            "subject": subject,
        });
        if is_html {
            payload["htmlContent"] = Value::String(message.to_string());
        } else {
            payload["textContent"] = Value::String(message.to_string());
        }

        let mut attached: Option<String> = None;
        if let Some(reference) = attachment_ref {
            if let Some(path) = self.resolve_attachment(reference) {
                match std::fs::read(&path) {
                    Ok(bytes) => {
                        let name = path
                            .file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_else(|| reference.to_string());
                        payload["attachment"] = serde_json::json!([{
                            "content": BASE64_STANDARD.encode(bytes),
                            "name": name,
                        }]);
                        attached = Some(name);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "attachment unreadable, sending without it");
                    }
                }
            }
        }

        let url = format!("{}/smtp/email", self.mail.api_base.trim_end_matches('/'));
        let response = match self
            .client
            .post(&url)
            .header("api-key", api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return Ok(ToolOutput::message(format!(
                    "Erreur lors de l'envoi de l'email : {}",
                    e
                )))
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Ok(ToolOutput::message(format!(
                "Erreur du fournisseur d'email ({}) : {}",
                status, body
            )));
        }

        let suffix = attached
            .map(|n| format!(" avec pièce jointe ({})", n))
            .unwrap_or_default();
        Ok(ToolOutput::message(format!(
            "📧 Email envoyé avec succès à {}{}",
            recipient, suffix
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::output::ARTIFACT_DELIMITER;

    fn section_with_env(env: &str) -> MailSection {
        MailSection {
            api_key_env: env.to_string(),
            ..MailSection::default()
        }
    }

    // 凭证缺失：同通道失败消息，无分隔符，且不应发起网络调用（同步即返）
    #[tokio::test]
    async fn test_missing_credential_is_config_failure() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SendMailTool::new(section_with_env("PLUME_TEST_NO_SUCH_KEY"), dir.path());
        let out = tool
            .execute(serde_json::json!({
                "recipient_email": "a@b.fr",
                "subject": "Test",
                "message": "Bonjour"
            }))
            .await
            .unwrap();
        assert!(out.message.contains("clé API"));
        assert!(!out.encode().contains(ARTIFACT_DELIMITER));
    }

    #[tokio::test]
    async fn test_missing_recipient_is_validation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SendMailTool::new(section_with_env("PLUME_TEST_NO_SUCH_KEY"), dir.path());
        let out = tool
            .execute(serde_json::json!({ "subject": "Test", "message": "Bonjour" }))
            .await
            .unwrap();
        assert!(out.message.contains("recipient_email"));
    }

    #[test]
    fn test_attachment_with_separator_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SendMailTool::new(section_with_env("X"), dir.path());
        assert!(tool.resolve_attachment("../secret.pdf").is_none());
        assert!(tool.resolve_attachment("a/b.pdf").is_none());
    }

    #[test]
    fn test_attachment_resolved_by_basename() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("rapport.pdf"), b"%PDF").unwrap();
        let tool = SendMailTool::new(section_with_env("X"), dir.path());
        assert!(tool.resolve_attachment("rapport.pdf").is_some());
        assert!(tool.resolve_attachment("absent.pdf").is_none());
    }
}
