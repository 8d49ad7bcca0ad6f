//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），
//! 由 ToolRegistry 按名注册与查找；执行前按声明 schema 校验必填参数，
//! ToolExecutor 在调用时加超时并统一转 AgentError。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::ToolOutput;

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（用于 JSON 中的 "tool" 字段）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema（供 LLM 生成正确的参数格式，并用于执行前的必填校验）
    /// 默认返回空对象，表示无参数或参数格式不限
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 执行工具；校验类与内部失败以失败消息形式返回 Ok(ToolOutput::message(..))，
    /// Err 保留给执行器层面的故障
    async fn execute(&self, args: Value) -> Result<ToolOutput, String>;
}

/// 工具注册表：按名称存储 Arc<dyn Tool>，支持 register / get / execute / tool_names
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// 按声明 schema 的 required 列表校验参数齐备（缺失或为 null 视为未提供）
    pub fn validate_args(&self, name: &str, args: &Value) -> Result<(), String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| format!("Unknown tool: {name}"))?;
        let schema = tool.parameters_schema();
        let required = schema
            .get("required")
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default();
        if required.is_empty() {
            return Ok(());
        }
        let obj = args
            .as_object()
            .ok_or_else(|| format!("{name}: args must be a JSON object"))?;
        for field in required {
            let Some(field) = field.as_str() else { continue };
            match obj.get(field) {
                Some(v) if !v.is_null() => {}
                _ => return Err(format!("{name}: missing required argument '{field}'")),
            }
        }
        Ok(())
    }

    /// 查找、校验并执行指定工具
    pub async fn execute(&self, name: &str, args: Value) -> Result<ToolOutput, String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| format!("Unknown tool: {name}"))?;
        self.validate_args(name, &args)?;
        tool.execute(args).await
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// 返回 (name, description) 列表，用于生成 prompt 中的 Available tools 段落
    pub fn tool_descriptions(&self) -> Vec<(String, String)> {
        self.tools
            .iter()
            .map(|(name, tool)| (name.clone(), tool.description().to_string()))
            .collect()
    }

    /// 生成工具 schema JSON，注入系统提示供 LLM 输出正确的 Tool Call
    pub fn to_schema_json(&self) -> String {
        let tools: Vec<serde_json::Value> = self
            .tools
            .iter()
            .map(|(name, tool)| {
                serde_json::json!({
                    "name": name,
                    "description": tool.description(),
                    "parameters": tool.parameters_schema()
                })
            })
            .collect();
        serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::EchoTool;

    #[tokio::test]
    async fn test_register_and_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let out = registry
            .execute("echo", serde_json::json!({"text": "salut"}))
            .await
            .unwrap();
        assert_eq!(out.message, "salut");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error() {
        let registry = ToolRegistry::new();
        let err = registry.execute("nope", serde_json::json!({})).await;
        assert!(err.is_err());
    }

    #[test]
    fn test_validate_args_missing_required() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let err = registry
            .validate_args("echo", &serde_json::json!({}))
            .unwrap_err();
        assert!(err.contains("text"));
    }
}
