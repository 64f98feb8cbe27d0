//! 重试处理：为下一次规划准备状态
//!
//! 递增 retry_count，记录纠正反馈，清空本次的计划 / 答案 / 分数；trace 与类别保留。

use crate::core::{RunPhase, RunState};

/// 评分没有给出反馈时使用的默认纠正提示
pub fn default_feedback(score: f32, threshold: f32) -> String {
    format!(
        "The previous answer scored {score:.1}/10, below the required {threshold:.1}. \
         Be more complete, accurate and directly address the question."
    )
}

/// 进入 Retrying 阶段并为下一轮规划重置状态
pub fn prepare_retry(state: &mut RunState, threshold: f32) {
    state.enter(RunPhase::Retrying);
    let score = state.score.take();
    let feedback = score
        .as_ref()
        .and_then(|s| s.feedback.clone())
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| default_feedback(score.as_ref().map_or(0.0, |s| s.value), threshold));

    let retry_count = state.bump_retry_count();
    tracing::info!(
        run_id = %state.run_id,
        retry_count,
        score = score.as_ref().map(|s| s.value),
        "retrying with feedback"
    );
    state.retry_feedback = Some(feedback);
    state.plan = None;
    state.answer = None;
}
