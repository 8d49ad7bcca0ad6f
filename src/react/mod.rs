//! Planner 与有界 Plan/Act 循环

pub mod loop_;
pub mod planner;

pub use loop_::{react_loop, ReactResult, ToolInvocation};
pub use planner::{parse_llm_output, Planner, PlannerOutput, ToolCall};
