//! 产物工作区
//!
//! 所有生成的文件落在配置的 workspace 根目录下。用户可控的命名字段先经
//! safe_file_name 过滤；边界层按 basename 下载前先经 validate_basename
//! 整体拒绝含路径分隔符或上级目录标记的输入（判无效，而非悄悄清洗），
//! 再用限定在 workspace 内的遍历查找文件。

use std::path::{Path, PathBuf};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use walkdir::WalkDir;

use crate::core::AgentError;

/// URL 路径段中需要转义的字符（保持 'rapport.pdf' 原样可读）
const PATH_SEGMENT_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?')
    .add(b'\\');

/// 从用户提供的名字派生安全文件名：仅保留字母数字、空格、连字符与下划线
pub fn safe_file_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
        .collect::<String>()
        .trim()
        .to_string()
}

/// 校验下载/解析请求中的 basename：
/// 含 `/`、`\` 或 `..` 的输入在任何文件系统访问之前整体拒绝
pub fn validate_basename(name: &str) -> Result<(), AgentError> {
    if name.trim().is_empty() {
        return Err(AgentError::InvalidInput("empty file name".to_string()));
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(AgentError::PathEscape(name.to_string()));
    }
    Ok(())
}

/// 在 workspace 下按 basename 查找文件（限定遍历范围，不跟随工作区外的任何路径）
pub fn find_by_basename(workspace: &Path, basename: &str) -> Option<PathBuf> {
    WalkDir::new(workspace)
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_file() && e.file_name().to_string_lossy() == basename)
        .map(|e| e.into_path())
}

/// 产物引用的解析结果：定位成功给下载地址，否则原样回显作诊断
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedArtifact {
    Download { file_url: String, file_name: String },
    Unresolved { file_path: String },
}

/// 将工具返回的产物引用解析为可下载资源：
/// 裸文件名在 workspace 内检索并生成 /mcp/download/ 地址；
/// 含分隔符、`..` 的引用或检索不到的名字降级为诊断回显
pub fn resolve_artifact(workspace: &Path, reference: &str) -> ResolvedArtifact {
    if validate_basename(reference).is_ok() && find_by_basename(workspace, reference).is_some() {
        ResolvedArtifact::Download {
            file_url: format!(
                "/mcp/download/{}",
                utf8_percent_encode(reference, PATH_SEGMENT_ENCODE)
            ),
            file_name: reference.to_string(),
        }
    } else {
        ResolvedArtifact::Unresolved {
            file_path: reference.to_string(),
        }
    }
}
