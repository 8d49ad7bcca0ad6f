//! build_excel 工具：表头 + 数据行生成 .xlsx 工作簿
//!
//! 表头行加粗白字蓝底居中，数字按数值写入（其余按文本），列宽自动适配。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook};
use serde_json::Value;

use crate::tools::{Tool, ToolOutput};
use crate::workspace::safe_file_name;

const HEADER_FILL: u32 = 0x4472C4;

/// Excel 工作簿生成工具
pub struct BuildExcelTool {
    workspace: PathBuf,
}

impl BuildExcelTool {
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
        }
    }

    fn build_workbook(
        &self,
        headers: &[String],
        rows: &[Vec<Value>],
        path: &Path,
    ) -> Result<(), String> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        let header_format = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(HEADER_FILL))
            .set_align(FormatAlign::Center);

        for (col, header) in headers.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, header.as_str(), &header_format)
                .map_err(|e| e.to_string())?;
        }

        for (r, row) in rows.iter().enumerate() {
            let r = (r + 1) as u32;
            for (c, cell) in row.iter().enumerate() {
                let c = c as u16;
                match cell {
                    Value::Number(n) => {
                        let v = n.as_f64().unwrap_or(0.0);
                        worksheet.write_number(r, c, v).map_err(|e| e.to_string())?;
                    }
                    Value::Bool(b) => {
                        worksheet.write_boolean(r, c, *b).map_err(|e| e.to_string())?;
                    }
                    Value::Null => {}
                    Value::String(s) => {
                        worksheet
                            .write_string(r, c, s.as_str())
                            .map_err(|e| e.to_string())?;
                    }
                    other => {
                        worksheet
                            .write_string(r, c, other.to_string())
                            .map_err(|e| e.to_string())?;
                    }
                }
            }
        }

        worksheet.autofit();
        workbook.save(path).map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[async_trait]
impl Tool for BuildExcelTool {
    fn name(&self) -> &str {
        "build_excel"
    }

    fn description(&self) -> &str {
        "Create a professional Excel workbook (.xlsx) with a styled header row and auto-fitted columns. \
         Args: {\"name\": \"file name without extension\", \"headers\": [\"col\", ...], \"rows\": [[cell, ...], ...]}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "File name without the .xlsx extension" },
                "headers": { "type": "array", "description": "Column titles", "items": { "type": "string" } },
                "rows": { "type": "array", "description": "Data rows, one array of cells per row" }
            },
            "required": ["name", "headers", "rows"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let name = args.get("name").and_then(|v| v.as_str()).unwrap_or("").trim();
        if name.is_empty() {
            return Ok(ToolOutput::message(
                "Erreur Excel : champ requis manquant ou vide : 'name'".to_string(),
            ));
        }
        let Some(headers) = args.get("headers").and_then(|v| v.as_array()) else {
            return Ok(ToolOutput::message(
                "Erreur Excel : champ requis manquant : 'headers' (liste des titres de colonnes)".to_string(),
            ));
        };
        let Some(rows) = args.get("rows").and_then(|v| v.as_array()) else {
            return Ok(ToolOutput::message(
                "Erreur Excel : champ requis manquant : 'rows' (données ligne par ligne)".to_string(),
            ));
        };

        let headers: Vec<String> = headers
            .iter()
            .map(|h| match h {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        if headers.is_empty() {
            return Ok(ToolOutput::message(
                "Erreur Excel : 'headers' ne peut pas être vide".to_string(),
            ));
        }

        let mut parsed_rows: Vec<Vec<Value>> = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            match row.as_array() {
                Some(cells) => parsed_rows.push(cells.clone()),
                None => {
                    return Ok(ToolOutput::message(format!(
                        "Erreur Excel : la ligne {} n'est pas une liste de cellules",
                        i + 1
                    )))
                }
            }
        }

        let stem = safe_file_name(name);
        if stem.is_empty() {
            return Ok(ToolOutput::message(
                "Erreur Excel : nom de fichier invalide après nettoyage".to_string(),
            ));
        }
        let file_name = format!("{}.xlsx", stem);
        let path = self.workspace.join(&file_name);

        match self.build_workbook(&headers, &parsed_rows, &path) {
            Ok(()) => Ok(ToolOutput::with_artifact(
                format!("Excel '{}' généré avec succès !", file_name),
                file_name,
            )),
            Err(e) => Ok(ToolOutput::message(format!("Erreur Excel : {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use calamine::{open_workbook, Data, Reader, Xlsx};

    use super::*;
    use crate::tools::output::ARTIFACT_DELIMITER;

    #[tokio::test]
    async fn test_workbook_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let tool = BuildExcelTool::new(dir.path());
        let out = tool
            .execute(serde_json::json!({
                "name": "data",
                "headers": ["A", "B"],
                "rows": [[1, 2], [3, 4]]
            }))
            .await
            .unwrap();
        assert_eq!(out.artifact.as_deref(), Some("data.xlsx"));
        assert_eq!(out.encode().matches(ARTIFACT_DELIMITER).count(), 1);

        // 重新打开：首行为表头，后两行为数据
        let path = dir.path().join("data.xlsx");
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

    #[tokio::test]
    async fn test_missing_rows_yields_failure() {
        let dir = tempfile::tempdir().unwrap();
        let tool = BuildExcelTool::new(dir.path());
        let out = tool
            .execute(serde_json::json!({ "name": "data", "headers": ["A"] }))
            .await
            .unwrap();
        assert!(!out.encode().contains(ARTIFACT_DELIMITER));
        assert!(!dir.path().join("data.xlsx").exists());
    }

    #[tokio::test]
    async fn test_mixed_cell_types() {
        let dir = tempfile::tempdir().unwrap();
        let tool = BuildExcelTool::new(dir.path());
        let out = tool
            .execute(serde_json::json!({
                "name": "mixte",
                "headers": ["Produit", "Prix", "Dispo"],
                "rows": [["Café", 3.5, true], ["Thé", 2, false]]
            }))
            .await
            .unwrap();
        assert!(out.artifact.is_some());
        assert!(dir.path().join("mixte.xlsx").exists());
    }
}
