//! 工作流类型定义
//!
//! 任务类别、工作流步骤、执行计划与步骤结果

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::AgentError;
use crate::tools::ASK_SPECIALIST;

/// 步骤参数（工具名之外的全部入参）
pub type StepParams = Map<String, Value>;

/// 任务类别：决定套用哪份计划模板
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    /// 掷骰：工具输出即最终答案
    DiceAction,
    /// 需要检索与多步加工的研究型问题
    Research,
    /// 兜底的一般问答
    General,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::DiceAction => "dice_action",
            TaskCategory::Research => "research",
            TaskCategory::General => "general",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 步骤失败策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPolicy {
    /// 记录错误，以空输出继续后续步骤
    #[default]
    Continue,
    /// 记录错误并放弃计划剩余步骤
    Abort,
}

/// 计划中的一次工具调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub tool_name: String,
    pub parameters: StepParams,
    pub label: String,
    #[serde(default)]
    pub policy: StepPolicy,
}

impl WorkflowStep {
    pub fn new(tool_name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters: StepParams::new(),
            label: label.into(),
            policy: StepPolicy::Continue,
        }
    }

    /// 设置参数
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// 失败时中止剩余计划
    pub fn abort_on_failure(mut self) -> Self {
        self.policy = StepPolicy::Abort;
        self
    }

    /// 是否为模型调用步骤（重试反馈只注入这类步骤）
    pub fn is_model_call(&self) -> bool {
        self.tool_name == ASK_SPECIALIST
    }

    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }

    /// 展示用名称，模型调用带上 profile，如 `ask_specialist(summarize)`
    pub fn display_name(&self) -> String {
        match self.str_param("profile") {
            Some(profile) if self.is_model_call() => format!("{}({})", self.tool_name, profile),
            _ => self.tool_name.clone(),
        }
    }
}

/// 一次尝试的有序步骤列表；空计划合法（不做任何事）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub steps: Vec<WorkflowStep>,
}

impl ExecutionPlan {
    pub fn new(steps: Vec<WorkflowStep>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.tool_name.as_str()).collect()
    }

    pub fn describe(&self) -> Vec<String> {
        self.steps.iter().map(WorkflowStep::display_name).collect()
    }
}

/// 步骤失败类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Failed,
    Timeout,
    UnknownTool,
}

/// 记录在 StepResult 中的错误
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AgentError> for ErrorInfo {
    fn from(err: &AgentError) -> Self {
        let kind = match err {
            AgentError::ToolTimeout(_) => ErrorKind::Timeout,
            AgentError::UnknownTool(_) => ErrorKind::UnknownTool,
            _ => ErrorKind::Failed,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// 单步执行结果，写入 trace 后不再修改
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub step: WorkflowStep,
    /// 失败时为 None（降级继续时以空输出代替）
    pub output: Option<String>,
    pub error: Option<ErrorInfo>,
    pub duration: Duration,
    /// 所属尝试序号（0 为首次，与当时的 retry_count 相同）
    pub attempt: u32,
}

impl StepResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
