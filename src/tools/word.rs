//! build_word 工具：结构化字段生成 .docx 信函
//!
//! 页面设置 2.5cm 边距，寄件人右对齐、收件人与日期左对齐、对象行加粗、
//! 标题居中；正文按空行分段，`- ` 起始的段落渲染为项目符号列表。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use docx_rs::{AlignmentType, Docx, PageMargin, Paragraph, Run};
use serde_json::Value;

use crate::tools::{Tool, ToolOutput};
use crate::workspace::safe_file_name;

/// 2.5cm，twip 单位
const MARGIN_TWIPS: i32 = 1417;

/// Word 信函生成工具
pub struct BuildWordTool {
    workspace: PathBuf,
}

impl BuildWordTool {
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
        }
    }

    fn build_document(
        &self,
        title: &str,
        recipient: &str,
        sender: &str,
        date: &str,
        subject: &str,
        body: &str,
        path: &Path,
    ) -> Result<(), String> {
        let mut doc = Docx::new().page_margin(
            PageMargin::new()
                .top(MARGIN_TWIPS)
                .bottom(MARGIN_TWIPS)
                .left(MARGIN_TWIPS)
                .right(MARGIN_TWIPS),
        );

        // 寄件人坐标（右对齐，逐行）
        for line in sender.lines() {
            doc = doc.add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text(line))
                    .align(AlignmentType::Right),
            );
        }

        // 收件人与日期
        for line in recipient.lines() {
            doc = doc.add_paragraph(Paragraph::new().add_run(Run::new().add_text(line)));
        }
        doc = doc.add_paragraph(Paragraph::new().add_run(Run::new().add_text(date)));

        // 对象行：前缀加粗
        doc = doc.add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text("Objet : ").bold())
                .add_run(Run::new().add_text(subject)),
        );
        doc = doc.add_paragraph(Paragraph::new());

        // 标题居中加大
        doc = doc.add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(title).bold().size(32))
                .align(AlignmentType::Center),
        );
        doc = doc.add_paragraph(Paragraph::new());

        // 正文：空行分段，"- " 段落转项目符号
        for block in body.split("\n\n") {
            let block = block.trim();
            if block.is_empty() {
                continue;
            }
            if block.starts_with("- ") {
                for item in block.lines() {
                    let item = item.trim().trim_start_matches("- ").trim();
                    if item.is_empty() {
                        continue;
                    }
                    doc = doc.add_paragraph(
                        Paragraph::new()
                            .add_run(Run::new().add_text(format!("• {}", item)))
                            .indent(Some(720), None, None, None),
                    );
                }
            } else {
                doc = doc.add_paragraph(Paragraph::new().add_run(Run::new().add_text(block)));
            }
        }

        let file = std::fs::File::create(path).map_err(|e| e.to_string())?;
        doc.build().pack(file).map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[async_trait]
impl Tool for BuildWordTool {
    fn name(&self) -> &str {
        "build_word"
    }

    fn description(&self) -> &str {
        "Create a professional Word letter (.docx): margins, sender/recipient blocks, bold subject line, \
         centred title, paragraphs and '- ' bullet lists. \
         Args: {\"title\", \"recipient\", \"sender\", \"date\", \"subject\", \"body\", \"filename\"}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": { "type": "string", "description": "Main document title (e.g. 'Lettre de Motivation')" },
                "recipient": { "type": "string", "description": "Recipient name and address (multiline allowed)" },
                "sender": { "type": "string", "description": "Sender contact block (name, address, email, phone)" },
                "date": { "type": "string", "description": "Date line (e.g. 'Paris, le 23 décembre 2025')" },
                "subject": { "type": "string", "description": "Subject of the letter" },
                "body": { "type": "string", "description": "Full body, paragraphs separated by blank lines; '- item' makes a bullet list" },
                "filename": { "type": "string", "description": "File name without extension" }
            },
            "required": ["title", "recipient", "sender", "date", "subject", "body", "filename"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let mut fields = [("title", ""), ("recipient", ""), ("sender", ""), ("date", ""), ("subject", ""), ("body", ""), ("filename", "")];
        for (key, slot) in fields.iter_mut() {
            match args.get(*key).and_then(|v| v.as_str()) {
                Some(s) if !s.trim().is_empty() => *slot = s,
                _ => {
                    return Ok(ToolOutput::message(format!(
                        "Erreur Word : champ requis manquant ou vide : '{}'",
                        key
                    )))
                }
            }
        }
        let [(_, title), (_, recipient), (_, sender), (_, date), (_, subject), (_, body), (_, filename)] =
            fields;

        let stem = safe_file_name(filename);
        if stem.is_empty() {
            return Ok(ToolOutput::message(
                "Erreur Word : nom de fichier invalide après nettoyage".to_string(),
            ));
        }
        let file_name = format!("{}.docx", stem);
        let path = self.workspace.join(&file_name);

        match self.build_document(title, recipient, sender, date, subject, body, &path) {
            Ok(()) => Ok(ToolOutput::with_artifact(
                format!("Document Word '{}' généré avec succès !", file_name),
                file_name,
            )),
            Err(e) => Ok(ToolOutput::message(format!("Erreur Word : {}", e))),
        }
    }
}
