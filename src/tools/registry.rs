//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / execute），由 ToolRegistry 按名注册与查找，
//! ToolExecutor 在调用时加超时并统一转 AgentError。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::workflow::StepParams;

/// 工具执行失败：普通失败记入 trace，Disconnected 会中止整次运行
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("{0}")]
    Failed(String),
    #[error("connection lost: {0}")]
    Disconnected(String),
}

/// 工具 trait：名称、描述、异步执行（参数为步骤的 JSON 映射）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（计划步骤中的 tool_name）
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn execute(&self, args: &StepParams) -> Result<String, ToolError>;
}

/// 工具注册表：按名称存储 Arc<dyn Tool>
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

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

/// 取必填字符串参数
pub(crate) fn required_str<'a>(args: &'a StepParams, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::Failed(format!("missing string argument '{key}'")))
}
