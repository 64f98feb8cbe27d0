//! 运行错误类型
//!
//! 只有 Configuration / Disconnected / Cancelled 会中止一次运行并返回给调用方；
//! 工具失败记入 trace，低质量答案属于正常的重试 / 放弃分支，不是错误。

use thiserror::Error;

/// 一次运行中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    /// 类别没有注册计划模板等编程 / 配置错误，直接中止运行
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Tool {tool} failed: {message}")]
    ToolExecutionFailed { tool: String, message: String },

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// 与工具 / 模型的连接整体丢失，无法继续
    #[error("Connection lost: {0}")]
    Disconnected(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Run cancelled")]
    Cancelled,
}

impl AgentError {
    /// 是否必须中止整个运行（其余错误被吸收进 RunState）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AgentError::Configuration(_) | AgentError::Disconnected(_) | AgentError::Cancelled
        )
    }
}
