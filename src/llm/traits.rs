//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient；专家工具与质量评分都经由它调用模型。

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::Message;

/// 模型调用错误：Connection 表示与模型服务的连接丢失，上层会中止运行
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Connection error: {0}")]
    Connection(String),
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成；max_tokens 为 None 时使用客户端默认上限
    async fn complete_with_limit(
        &self,
        messages: &[Message],
        max_tokens: Option<u32>,
    ) -> Result<String, LlmError>;

    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.complete_with_limit(messages, None).await
    }
}
