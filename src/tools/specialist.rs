//! 专家模型工具：按 profile 选取系统提示后调用 LLM
//!
//! 参数：{"prompt": "...", "profile": "summarize", "max_tokens": 1024}。
//! 未知 profile 或 max_tokens 不在 1..=4096 内视为工具错误；模型连接丢失映射为 ToolError::Disconnected。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{LlmClient, LlmError, Message};
use crate::tools::registry::required_str;
use crate::tools::{Tool, ToolError, ASK_SPECIALIST};
use crate::workflow::StepParams;

pub const DEFAULT_PROFILE: &str = "general";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const MAX_TOKENS_LIMIT: u32 = 4096;

/// profile → 系统提示
const PROFILES: &[(&str, &str)] = &[
    (
        "summarize",
        "You condense source material into a faithful, well-organized summary. Keep facts, drop filler.",
    ),
    (
        "explain",
        "You explain topics clearly to a curious non-expert, building from fundamentals to details.",
    ),
    (
        "creative",
        "You combine the provided material into one engaging, coherent final answer for the user.",
    ),
    (
        "general",
        "You are a knowledgeable assistant. Answer accurately and concisely.",
    ),
    (
        "code_review",
        "You review code for correctness, clarity and maintainability, citing concrete lines.",
    ),
];

pub fn system_prompt(profile: &str) -> Option<&'static str> {
    PROFILES
        .iter()
        .find(|(name, _)| *name == profile)
        .map(|(_, prompt)| *prompt)
}

/// 专家工具：持有共享的 LLM 客户端
pub struct SpecialistTool {
    llm: Arc<dyn LlmClient>,
}

impl SpecialistTool {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

fn parse_max_tokens(args: &StepParams) -> Result<u32, ToolError> {
    let Some(raw) = args.get("max_tokens") else {
        return Ok(DEFAULT_MAX_TOKENS);
    };
    match raw.as_u64() {
        Some(n) if (1..=MAX_TOKENS_LIMIT as u64).contains(&n) => Ok(n as u32),
        _ => Err(ToolError::Failed(format!(
            "max_tokens must be between 1 and {MAX_TOKENS_LIMIT}, got {raw}"
        ))),
    }
}

#[async_trait]
impl Tool for SpecialistTool {
    fn name(&self) -> &str {
        ASK_SPECIALIST
    }

    fn description(&self) -> &str {
        "Ask a specialist model. Args: {\"prompt\": \"...\", \"profile\": \"summarize|explain|creative|general|code_review\", \"max_tokens\": 1024}"
    }

    async fn execute(&self, args: &StepParams) -> Result<String, ToolError> {
        let prompt = required_str(args, "prompt")?;
        let profile = args
            .get("profile")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROFILE);
        let system = system_prompt(profile)
            .ok_or_else(|| ToolError::Failed(format!("Unknown specialist profile: {profile}")))?;
        let max_tokens = parse_max_tokens(args)?;

        let messages = [Message::system(system), Message::user(prompt)];
        self.llm
            .complete_with_limit(&messages, Some(max_tokens))
            .await
            .map_err(|e| match e {
                LlmError::Connection(msg) => ToolError::Disconnected(msg),
                LlmError::Api(msg) => ToolError::Failed(msg),
            })
    }
}
