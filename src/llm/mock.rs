//! Mock LLM 客户端（无 API Key 时使用，亦用于测试）
//!
//! 默认回显最后一条 User 消息；with_reply 可固定回复内容。

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message, Role};

/// Mock 客户端
#[derive(Debug, Default, Clone)]
pub struct MockLlmClient {
    reply: Option<String>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 固定回复
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete_with_limit(
        &self,
        messages: &[Message],
        _max_tokens: Option<u32>,
    ) -> Result<String, LlmError> {
        if let Some(reply) = &self.reply {
            return Ok(reply.clone());
        }
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(format!("Echo from Mock: {last_user}"))
    }
}
