//! Scout - 自适应工具路由助手核心
//!
//! 模块划分：
//! - **agent**: 按配置装配 LLM、工具与编排器
//! - **cognition**: 答案合成、质量评分与闸门
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误、运行状态、重试处理、取消与有界状态机
//! - **format**: 运行报告渲染
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **observability**: tracing 初始化
//! - **tools**: 工具注册表、带超时的执行器与协作工具
//! - **workflow**: 分类、计划构建与顺序执行

pub mod agent;
pub mod cognition;
pub mod config;
pub mod core;
pub mod format;
pub mod llm;
pub mod observability;
pub mod tools;
pub mod workflow;

pub use agent::build_agent;
pub use crate::core::{AgentError, Orchestrator, RunState};
