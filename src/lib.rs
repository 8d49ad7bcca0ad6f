//! Plume - Rust 办公文档智能体
//!
//! 模块划分：
//! - **agent**: 无头 Agent 运行时（供 HTTP 边界调用）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类（校验 / 依赖 / 预算 / 持久化）
//! - **gate**: 工具调用门禁（词法预筛 + 策略指令）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 会话历史与按会话持久化
//! - **react**: Planner 与有界 Plan/Act 循环
//! - **tools**: 工具箱（word / pdf / excel / mail / echo）与执行器
//! - **workspace**: 产物工作区（安全文件名、按 basename 查找）

pub mod agent;
pub mod config;
pub mod core;
pub mod gate;
pub mod llm;
pub mod memory;
pub mod react;
pub mod tools;
pub mod workspace;
