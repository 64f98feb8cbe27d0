//! 计划执行引擎
//!
//! 严格按顺序执行每个 WorkflowStep：解析参数模板（{query} / {previous}）、调用工具、计时、
//! 记录输出或错误。失败步骤按 StepPolicy 决定继续（空输出）还是中止剩余计划；
//! 引擎本身不对单次调用重试，重试由质量闸门在运行层面负责。

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::core::{run_cancellable, AgentError};
use crate::tools::ToolInvoker;
use crate::workflow::builder::RETRY_FEEDBACK_PARAM;
use crate::workflow::types::*;

/// 参数模板中的查询占位符
pub const QUERY_SLOT: &str = "{query}";
/// 参数模板中的上一步输出占位符
pub const PREVIOUS_SLOT: &str = "{previous}";

/// 单次执行的上下文
pub struct ExecutionContext<'a> {
    pub query: &'a str,
    /// 当前尝试序号（写入每条 StepResult）
    pub attempt: u32,
    pub cancel: &'a CancellationToken,
}

/// 计划执行器：持有工具调用能力
pub struct Executor {
    invoker: Arc<dyn ToolInvoker>,
}

impl Executor {
    pub fn new(invoker: Arc<dyn ToolInvoker>) -> Self {
        Self { invoker }
    }

    /// 顺序执行计划；仅致命错误（断连、取消）返回 Err，工具失败记入结果
    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Vec<StepResult>, AgentError> {
        let mut results = Vec::with_capacity(plan.len());
        let mut previous: Option<String> = None;

        for (index, step) in plan.steps.iter().enumerate() {
            if ctx.cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            tracing::info!(
                step = index + 1,
                total = plan.len(),
                tool = %step.display_name(),
                label = %step.label,
                attempt = ctx.attempt,
                "executing step"
            );

            let params = resolve_params(&step.parameters, ctx.query, previous.as_deref());
            let start = Instant::now();
            let outcome = run_cancellable(ctx.cancel, self.invoker.invoke(&step.tool_name, &params)).await;
            let duration = start.elapsed();

            match outcome {
                Ok(output) => {
                    previous = Some(output.clone());
                    results.push(StepResult {
                        step: step.clone(),
                        output: Some(output),
                        error: None,
                        duration,
                        attempt: ctx.attempt,
                    });
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(tool = %step.tool_name, error = %e, policy = ?step.policy, "step failed");
                    previous = None;
                    results.push(StepResult {
                        step: step.clone(),
                        output: None,
                        error: Some(ErrorInfo::from(&e)),
                        duration,
                        attempt: ctx.attempt,
                    });
                    if step.policy == StepPolicy::Abort {
                        tracing::warn!(skipped = plan.len() - index - 1, "aborting remaining plan");
                        break;
                    }
                }
            }
        }

        Ok(results)
    }
}

/// 将字符串参数中的占位符替换为实际值；非字符串参数与重试反馈原样保留，
/// 反馈在解析之后追加到 prompt 末尾
pub fn resolve_params(params: &StepParams, query: &str, previous: Option<&str>) -> StepParams {
    let mut resolved: StepParams = params
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(template) if key != RETRY_FEEDBACK_PARAM => {
                    Value::String(resolve_template(template, query, previous))
                }
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect();

    if let Some(feedback) = params.get(RETRY_FEEDBACK_PARAM).and_then(Value::as_str) {
        if let Some(Value::String(prompt)) = resolved.get_mut("prompt") {
            prompt.push_str("\n\nFeedback on the previous attempt:\n");
            prompt.push_str(feedback);
        }
    }
    resolved
}

/// 单遍替换，已替换进来的文本不会被再次解析
fn resolve_template(template: &str, query: &str, previous: Option<&str>) -> String {
    let previous = previous.unwrap_or("(no results from the previous step)");
    let mut out = String::with_capacity(template.len() + query.len());
    let mut rest = template;
    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix(QUERY_SLOT) {
            out.push_str(query);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(PREVIOUS_SLOT) {
            out.push_str(previous);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
