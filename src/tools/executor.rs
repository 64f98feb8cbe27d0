//! 工具执行器
//!
//! ToolInvoker 是编排层依赖的工具调用能力；ToolExecutor 是其基于 ToolRegistry 的实现：
//! 对每次调用施加超时，超时或失败时转为 AgentError（ToolTimeout / ToolExecutionFailed），
//! 每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::timeout;

use crate::core::AgentError;
use crate::tools::{ToolError, ToolRegistry};
use crate::workflow::StepParams;

/// 工具调用能力：一次调用对应一个 WorkflowStep
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, tool_name: &str, params: &StepParams) -> Result<String, AgentError>;
}

/// 工具执行器：对每次调用施加超时，并将结果映射为 AgentError
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self::with_timeout(registry, Duration::from_secs(timeout_secs))
    }

    pub fn with_timeout(registry: ToolRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }
}

#[async_trait]
impl ToolInvoker for ToolExecutor {
    async fn invoke(&self, tool_name: &str, params: &StepParams) -> Result<String, AgentError> {
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| AgentError::UnknownTool(tool_name.to_string()))?;

        let start = Instant::now();
        let result = timeout(self.timeout, tool.execute(params)).await;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(ToolError::Disconnected(_))) => (false, "disconnected"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "args_preview": args_preview(params),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(ToolError::Disconnected(msg))) => Err(AgentError::Disconnected(msg)),
            Ok(Err(ToolError::Failed(message))) => Err(AgentError::ToolExecutionFailed {
                tool: tool_name.to_string(),
                message,
            }),
            Err(_) => Err(AgentError::ToolTimeout(tool_name.to_string())),
        }
    }
}

fn args_preview(args: &StepParams) -> String {
    let s = serde_json::Value::Object(args.clone()).to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
