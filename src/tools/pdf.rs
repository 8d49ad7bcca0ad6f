//! build_pdf 工具：标题 + 正文生成 A4 报告
//!
//! 使用 PDF 内置 Helvetica 字体（无需外部字体文件），2cm 边距，
//! 正文按行宽折行、满页自动换页。

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use serde_json::Value;

use crate::tools::{Tool, ToolOutput};
use crate::workspace::safe_file_name;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const TITLE_PT: f32 = 18.0;
const BODY_PT: f32 = 11.0;
const LINE_STEP_MM: f32 = 6.0;
/// 11pt Helvetica 在 17cm 行宽下的近似字符容量
const WRAP_COLUMNS: usize = 90;

/// PDF 报告生成工具
pub struct BuildPdfTool {
    workspace: PathBuf,
}

impl BuildPdfTool {
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
        }
    }

    fn build_document(&self, title: &str, content: &str, path: &Path) -> Result<(), String> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let title_font = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| e.to_string())?;
        let body_font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| e.to_string())?;

        let mut current = doc.get_page(page).get_layer(layer);
        let mut y = PAGE_HEIGHT_MM - MARGIN_MM - 7.0;
        current.use_text(title, TITLE_PT, Mm(MARGIN_MM), Mm(y), &title_font);
        y -= 2.0 * LINE_STEP_MM;

        for line in wrap_lines(content, WRAP_COLUMNS) {
            if y < MARGIN_MM {
                let (next_page, next_layer) =
                    doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
                current = doc.get_page(next_page).get_layer(next_layer);
                y = PAGE_HEIGHT_MM - MARGIN_MM;
            }
            if !line.is_empty() {
                current.use_text(line.as_str(), BODY_PT, Mm(MARGIN_MM), Mm(y), &body_font);
            }
            y -= LINE_STEP_MM;
        }

        let file = std::fs::File::create(path).map_err(|e| e.to_string())?;
        doc.save(&mut BufWriter::new(file)).map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// 按词折行；保留原始换行，空行表示段落间距
fn wrap_lines(content: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in content.lines() {
        let raw = raw.trim_end();
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut line = String::new();
        for word in raw.split_whitespace() {
            if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > columns {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

#[async_trait]
impl Tool for BuildPdfTool {
    fn name(&self) -> &str {
        "build_pdf"
    }

    fn description(&self) -> &str {
        "Generate a professional PDF report with a title and body text (A4, 2cm margins). \
         Args: {\"name\": \"file name without extension\", \"title\": \"report title\", \"content\": \"body text\"}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "File name without the .pdf extension" },
                "title": { "type": "string", "description": "Report title" },
                "content": { "type": "string", "description": "Body text of the report" }
            },
            "required": ["name", "title", "content"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let name = args.get("name").and_then(|v| v.as_str()).unwrap_or("").trim();
        let title = args.get("title").and_then(|v| v.as_str()).unwrap_or("").trim();
        let content = args.get("content").and_then(|v| v.as_str()).unwrap_or("").trim();
        for (key, value) in [("name", name), ("title", title), ("content", content)] {
            if value.is_empty() {
                return Ok(ToolOutput::message(format!(
                    "Erreur PDF : champ requis manquant ou vide : '{}'",
                    key
                )));
            }
        }

        let stem = safe_file_name(name);
        if stem.is_empty() {
            return Ok(ToolOutput::message(
                "Erreur PDF : nom de fichier invalide après nettoyage".to_string(),
            ));
        }
        let file_name = format!("{}.pdf", stem);
        let path = self.workspace.join(&file_name);

        match self.build_document(title, content, &path) {
            Ok(()) => Ok(ToolOutput::with_artifact(
                format!("PDF '{}' généré avec succès", file_name),
                file_name,
            )),
            Err(e) => Ok(ToolOutput::message(format!("Erreur PDF : {}", e))),
        }
    }
}
