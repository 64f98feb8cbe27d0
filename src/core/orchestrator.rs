//! 编排器：有界状态机
//!
//! Classifying → Planning → Executing → Synthesizing → Validating → {Formatting | Retrying}，
//! Retrying 回到 Planning（不重新分类）。最多 max_retries 次可重试的尝试，再加一次必然交付的最后尝试，
//! 只有配置错误、连接丢失与取消会以 Err 结束；其余情况都会产出 FinalAnswer。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cognition::{GateDecision, QualityGate, QualityScorer, Synthesizer};
use crate::config::AgentSection;
use crate::core::{prepare_retry, run_cancellable, AgentError, FinalAnswer, RunPhase, RunState};
use crate::tools::ToolInvoker;
use crate::workflow::{
    classify, CategoryProfile, ExecutionContext, Executor, PlanBuilder, TaskCategory,
};

/// 编排器：持有计划构建、执行、合成与质量闸门四个阶段
pub struct Orchestrator {
    planner: Arc<PlanBuilder>,
    executor: Executor,
    synthesizer: Synthesizer,
    gate: QualityGate,
}

impl Orchestrator {
    pub fn new(
        planner: Arc<PlanBuilder>,
        invoker: Arc<dyn ToolInvoker>,
        scorer: Arc<dyn QualityScorer>,
        cfg: &AgentSection,
    ) -> Self {
        Self::with_gate(planner, invoker, QualityGate::from_config(scorer, cfg))
    }

    pub fn with_gate(planner: Arc<PlanBuilder>, invoker: Arc<dyn ToolInvoker>, gate: QualityGate) -> Self {
        Self {
            planner,
            executor: Executor::new(invoker.clone()),
            synthesizer: Synthesizer::new(invoker),
            gate,
        }
    }

    /// 处理一次查询，返回带 final_answer 的 RunState
    pub async fn run(&self, query: &str, cancel: &CancellationToken) -> Result<RunState, AgentError> {
        let mut state = RunState::new(query);
        let max_retries = self.gate.max_retries();
        ensure_not_cancelled(cancel)?;

        let category = classify(&state.query);
        state.category = Some(category);
        let profile = self.planner.profile(category)?;
        tracing::info!(run_id = %state.run_id, category = %category, max_retries, "run started");

        for _ in 0..max_retries {
            match self.attempt(&mut state, category, profile, cancel).await? {
                GateDecision::Retry => prepare_retry(&mut state, self.gate.threshold()),
                decision => {
                    finish(&mut state, decision == GateDecision::GiveUp);
                    return Ok(state);
                }
            }
        }

        // 最后一次尝试：低于阈值也直接交付
        let decision = self.attempt(&mut state, category, profile, cancel).await?;
        finish(&mut state, decision != GateDecision::Pass);
        Ok(state)
    }

    /// 一次完整尝试：规划 → 执行 → 合成 → 评分，返回闸门判定
    async fn attempt(
        &self,
        state: &mut RunState,
        category: TaskCategory,
        profile: &CategoryProfile,
        cancel: &CancellationToken,
    ) -> Result<GateDecision, AgentError> {
        let query = state.query.clone();
        ensure_not_cancelled(cancel)?;
        state.enter(RunPhase::Planning);
        let plan = self
            .planner
            .build_plan(category, &query, state.retry_feedback.as_deref())?;

        state.enter(RunPhase::Executing);
        let ctx = ExecutionContext {
            query: &query,
            attempt: state.retry_count(),
            cancel,
        };
        let results = self.executor.execute(&plan, &ctx).await?;
        state.plan = Some(plan);
        state.append_results(results);

        ensure_not_cancelled(cancel)?;
        state.enter(RunPhase::Synthesizing);
        let answer = {
            let results = state.current_results();
            self.synthesizer
                .synthesize(profile, &query, &results, cancel)
                .await?
        };

        state.enter(RunPhase::Validating);
        let score = run_cancellable(cancel, self.gate.score(profile, &query, &answer)).await?;
        let decision = self.gate.decide(&score, state.retry_count());
        tracing::info!(
            run_id = %state.run_id,
            attempt = state.retry_count(),
            score = score.value,
            threshold = self.gate.threshold(),
            decision = ?decision,
            "quality checked"
        );
        state.answer = Some(answer);
        state.score = Some(score);
        Ok(decision)
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<(), AgentError> {
    if cancel.is_cancelled() {
        Err(AgentError::Cancelled)
    } else {
        Ok(())
    }
}

fn finish(state: &mut RunState, gave_up: bool) {
    state.enter(RunPhase::Formatting);
    let text = state.answer.clone().unwrap_or_default();
    let quality_score = state.score.as_ref().map_or(0.0, |s| s.value);
    if gave_up {
        tracing::warn!(
            run_id = %state.run_id,
            score = quality_score,
            retries = state.retry_count(),
            "retry limit reached, returning best effort answer"
        );
    }
    tracing::info!(
        run_id = %state.run_id,
        elapsed_ms = state.elapsed_ms(),
        steps = state.trace().len(),
        "run finished"
    );
    state.final_answer = Some(FinalAnswer {
        text,
        quality_score,
        gave_up,
    });
}
