//! 有界 Plan/Act 主循环
//!
//! Plan -> 解析 -> 工具执行 -> Observation 写回 -> 下一轮 Plan；首个最终回复即终止，
//! 步数预算用尽则以 BudgetExhausted（携带最后输出）上抛，由无头运行时转为尽力回答。
//! 门禁判否时为受限模式：system 追加纯文本指令，且解析出的 Tool Call 一律不执行
//! （注入纠正提示重试），保证该轮调用轨迹为空。

use crate::core::AgentError;
use crate::gate::{GateDecision, PolicyInstructions};
use crate::memory::{ConversationMemory, Message};
use crate::react::{parse_llm_output, Planner, PlannerOutput};
use crate::tools::ToolExecutor;

/// 单次工具调用记录（测试与审计用）
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool: String,
    pub ok: bool,
}

/// 循环执行结果：最终回复、本轮工作上下文与调用轨迹
#[derive(Debug)]
pub struct ReactResult {
    pub response: String,
    pub messages: Vec<Message>,
    pub invocations: Vec<ToolInvocation>,
}

/// 执行有界 Plan/Act 循环
///
/// context 是本轮的工作副本（含已加载历史）；Observation 等中间消息只进工作副本，
/// 持久化哪些 Turn 由调用方决定。
pub async fn react_loop(
    planner: &Planner,
    executor: &ToolExecutor,
    decision: &GateDecision,
    policy: &PolicyInstructions,
    context: &mut ConversationMemory,
    user_input: &str,
    max_steps: usize,
) -> Result<ReactResult, AgentError> {
    context.push(Message::user(user_input.to_string()));

    let system = if decision.actions_authorized {
        planner.base_system_prompt().to_string()
    } else {
        format!("{}\n\n{}", planner.base_system_prompt(), policy.restricted)
    };

    let mut invocations: Vec<ToolInvocation> = Vec::new();
    let mut last_llm_output = String::new();
    let mut step = 0;

    loop {
        if step >= max_steps {
            return Err(AgentError::BudgetExhausted {
                steps: max_steps,
                partial: last_llm_output,
            });
        }

        let output = planner.plan_with_system(context.messages(), &system).await?;
        last_llm_output = output.clone();

        match parse_llm_output(&output) {
            Ok(PlannerOutput::Response(resp)) => {
                context.push(Message::assistant(resp.clone()));
                return Ok(ReactResult {
                    response: resp,
                    messages: context.messages().to_vec(),
                    invocations,
                });
            }
            Ok(PlannerOutput::ToolCall(tc)) => {
                if !decision.actions_authorized {
                    // 受限模式下工具注册表不可达：不执行、不记录，注入纠正提示重试
                    tracing::warn!(tool = %tc.tool, "tool call suppressed on conversation-only turn");
                    context.push(Message::user(format!(
                        "{} Reply to the previous message in plain text.",
                        policy.restricted
                    )));
                    step += 1;
                    continue;
                }
                if !executor.tool_names().iter().any(|n| n == &tc.tool) {
                    context.push(Message::user(format!(
                        "Tool '{}' does not exist. Available tools: {}. Answer in plain text or call one of them.",
                        tc.tool,
                        executor.tool_names().join(", ")
                    )));
                    step += 1;
                    continue;
                }
                let observation = match executor.execute(&tc.tool, tc.args).await {
                    Ok(out) => {
                        invocations.push(ToolInvocation {
                            tool: tc.tool.clone(),
                            ok: true,
                        });
                        out.encode()
                    }
                    Err(e) => {
                        // 工具失败不中断循环，作为 Observation 交还模型
                        invocations.push(ToolInvocation {
                            tool: tc.tool.clone(),
                            ok: false,
                        });
                        format!("Error: {}", e)
                    }
                };
                // 将工具调用与结果写回对话，供下一轮 Plan 使用
                context.push(Message::assistant(format!(
                    "Tool call: {} | Result: {}",
                    tc.tool, observation
                )));
                context.push(Message::user(format!(
                    "Observation from {}: {}",
                    tc.tool, observation
                )));
            }
            Err(e) => {
                // 解析失败（如 JSON 截断），注入纠正提示后重试
                tracing::debug!(error = %e, "tool call JSON parse failed, retrying");
                context.push(Message::user(
                    "Your tool call was not valid JSON. Output a single JSON object \
                     {\"tool\": \"...\", \"args\": {...}} or answer in plain text."
                        .to_string(),
                ));
            }
        }

        step += 1;
    }
}
