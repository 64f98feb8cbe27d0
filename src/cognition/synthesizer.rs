//! 答案合成
//!
//! 权威类别直接取最后一步的输出（该步失败时取其错误信息）；其余类别把本次尝试的成功输出交给一次模型调用整合成最终答案。
//! 合成调用失败时退回最后一个成功输出，都没有时返回固定提示。

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::core::{run_cancellable, AgentError};
use crate::tools::{ToolInvoker, ASK_SPECIALIST};
use crate::workflow::{CategoryProfile, StepParams, StepResult};

pub const SYNTHESIS_FALLBACK: &str = "Unable to synthesize answer";

const SYNTHESIS_MAX_TOKENS: u64 = 1024;

/// 合成器：无状态，只经由 ToolInvoker 调用专家模型
pub struct Synthesizer {
    invoker: Arc<dyn ToolInvoker>,
}

impl Synthesizer {
    pub fn new(invoker: Arc<dyn ToolInvoker>) -> Self {
        Self { invoker }
    }

    pub async fn synthesize(
        &self,
        profile: &CategoryProfile,
        query: &str,
        results: &[&StepResult],
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        if profile.authoritative {
            // 失败的权威步骤把错误原文交给用户，而不是空答案
            return Ok(match results.last() {
                Some(StepResult { output: Some(out), .. }) => out.clone(),
                Some(StepResult { error: Some(err), .. }) => err.message.clone(),
                _ => String::new(),
            });
        }

        let outputs: Vec<&str> = results.iter().filter_map(|r| r.output.as_deref()).collect();
        let last_output = outputs.last().map(|s| s.to_string());

        let Some(synthesis_profile) = profile.synthesis_profile.as_deref() else {
            return Ok(last_output.unwrap_or_else(|| SYNTHESIS_FALLBACK.to_string()));
        };

        let params = synthesis_params(synthesis_profile, query, &outputs);
        match run_cancellable(cancel, self.invoker.invoke(ASK_SPECIALIST, &params)).await {
            Ok(answer) => Ok(answer),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "synthesis failed, falling back to last step output");
                Ok(last_output.unwrap_or_else(|| SYNTHESIS_FALLBACK.to_string()))
            }
        }
    }
}

fn synthesis_params(profile: &str, query: &str, outputs: &[&str]) -> StepParams {
    let material = if outputs.is_empty() {
        "(no step produced output)".to_string()
    } else {
        outputs
            .iter()
            .enumerate()
            .map(|(i, out)| format!("[{}]\n{}", i + 1, out))
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    let prompt = format!(
        "Create a final, polished answer to this question.\n\n\
         Original Question: {query}\n\n\
         Material:\n{material}\n\n\
         Answer directly, keep it clear and well structured, and include the key insights from the material."
    );

    let mut params = StepParams::new();
    params.insert("profile".into(), Value::from(profile));
    params.insert("prompt".into(), Value::from(prompt));
    params.insert("max_tokens".into(), Value::from(SYNTHESIS_MAX_TOKENS));
    params
}
