//! 质量闸门：给答案打分并决定通过、重试或放弃
//!
//! 权威类别（工具输出即答案）直接给满分；其余交给外部评分能力（QualityScorer）。
//! 评分失败不阻塞运行：除连接丢失外一律按阈值计分并在反馈中注明原因。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::AgentSection;
use crate::core::AgentError;
use crate::llm::{LlmClient, LlmError, Message};
use crate::workflow::CategoryProfile;

pub const MAX_SCORE: f32 = 10.0;

/// 答案评分：value 始终在 [0, 10]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityScore {
    pub value: f32,
    pub feedback: Option<String>,
}

impl QualityScore {
    /// 构造时夹到 [0, 10]，NaN 视为 0
    pub fn new(value: f32, feedback: Option<String>) -> Self {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, MAX_SCORE) };
        Self { value, feedback }
    }
}

/// 闸门判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    Pass,
    Retry,
    /// 已达重试上限：低分答案照常交付
    GiveUp,
}

/// 外部评分能力
#[async_trait]
pub trait QualityScorer: Send + Sync {
    async fn score(&self, query: &str, answer: &str) -> Result<QualityScore, AgentError>;
}

const SCORER_SYSTEM_PROMPT: &str = "You grade answers. Judge relevance, completeness, accuracy and clarity. \
Reply with a single number from 0 to 10 on the first line, then optionally one short paragraph of \
concrete feedback on how to improve the answer.";

/// 基于 LLM 的评分器：回复首行取分数，其余文本作为反馈
pub struct LlmScorer {
    llm: Arc<dyn LlmClient>,
}

impl LlmScorer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

/// 解析 "7"、"Score: 7.5"、"8/10" 等首行格式
pub fn parse_score_reply(reply: &str) -> Option<QualityScore> {
    let mut lines = reply.trim().lines();
    let first = lines.next()?.trim();
    let lowered = first.to_lowercase();
    let number = lowered
        .strip_prefix("score:")
        .unwrap_or(&lowered)
        .trim()
        .trim_end_matches('.');
    let number = number.strip_suffix("/10").unwrap_or(number).trim();
    let value: f32 = number.parse().ok()?;

    let feedback = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    Some(QualityScore::new(
        value,
        (!feedback.is_empty()).then_some(feedback),
    ))
}

#[async_trait]
impl QualityScorer for LlmScorer {
    async fn score(&self, query: &str, answer: &str) -> Result<QualityScore, AgentError> {
        let prompt = format!("Question:\n{query}\n\nAnswer to evaluate:\n{answer}");
        let messages = [Message::system(SCORER_SYSTEM_PROMPT), Message::user(prompt)];
        let reply = self
            .llm
            .complete_with_limit(&messages, Some(256))
            .await
            .map_err(|e| match e {
                LlmError::Connection(msg) => AgentError::Disconnected(msg),
                LlmError::Api(msg) => AgentError::Llm(msg),
            })?;
        parse_score_reply(&reply)
            .ok_or_else(|| AgentError::Llm(format!("unparseable score reply: {}", reply.trim())))
    }
}

/// 质量闸门：持有评分能力、阈值与重试上限
pub struct QualityGate {
    scorer: Arc<dyn QualityScorer>,
    threshold: f32,
    max_retries: u32,
}

impl QualityGate {
    pub fn new(scorer: Arc<dyn QualityScorer>, threshold: f32, max_retries: u32) -> Self {
        Self {
            scorer,
            threshold,
            max_retries,
        }
    }

    pub fn from_config(scorer: Arc<dyn QualityScorer>, cfg: &AgentSection) -> Self {
        Self::new(scorer, cfg.quality_threshold, cfg.max_retries)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// 打分；只有连接丢失 / 取消会返回 Err
    pub async fn score(
        &self,
        profile: &CategoryProfile,
        query: &str,
        answer: &str,
    ) -> Result<QualityScore, AgentError> {
        if profile.authoritative {
            return Ok(QualityScore::new(MAX_SCORE, None));
        }
        match self.scorer.score(query, answer).await {
            Ok(score) => Ok(QualityScore::new(score.value, score.feedback)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, threshold = self.threshold, "scoring failed, defaulting to threshold");
                Ok(QualityScore::new(
                    self.threshold,
                    Some(format!("Quality check unavailable: {e}")),
                ))
            }
        }
    }

    pub fn decide(&self, score: &QualityScore, retry_count: u32) -> GateDecision {
        if score.value >= self.threshold {
            GateDecision::Pass
        } else if retry_count < self.max_retries {
            GateDecision::Retry
        } else {
            GateDecision::GiveUp
        }
    }
}
