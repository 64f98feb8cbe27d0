//! 运行状态：一次查询从分类到最终答案的全部可变状态
//!
//! RunState 由状态机独占持有，按 `&mut` 依次交给各阶段；trace 只追加、retry_count 只增。

use serde::Serialize;

use crate::cognition::QualityScore;
use crate::workflow::{ExecutionPlan, StepResult, TaskCategory};

/// 状态机阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Classifying,
    Planning,
    Executing,
    Synthesizing,
    Validating,
    Retrying,
    Formatting,
}

/// 交付给调用方的最终答案
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FinalAnswer {
    pub text: String,
    pub quality_score: f32,
    /// 达到重试上限仍低于阈值时为 true（答案照常交付）
    pub gave_up: bool,
}

/// 一次运行的状态
#[derive(Clone, Debug, Serialize)]
pub struct RunState {
    pub run_id: String,
    pub query: String,
    pub phase: RunPhase,
    /// 首次分类后在各次重试中保持不变
    pub category: Option<TaskCategory>,
    pub plan: Option<ExecutionPlan>,
    pub answer: Option<String>,
    pub score: Option<QualityScore>,
    pub retry_feedback: Option<String>,
    pub final_answer: Option<FinalAnswer>,
    /// 开始时间（Unix 毫秒）
    pub started_at: i64,
    trace: Vec<StepResult>,
    retry_count: u32,
}

impl RunState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            query: query.into(),
            phase: RunPhase::Classifying,
            category: None,
            plan: None,
            answer: None,
            score: None,
            retry_feedback: None,
            final_answer: None,
            started_at: chrono::Utc::now().timestamp_millis(),
            trace: Vec::new(),
            retry_count: 0,
        }
    }

    /// 切换阶段并记录
    pub fn enter(&mut self, phase: RunPhase) {
        tracing::debug!(run_id = %self.run_id, from = ?self.phase, to = ?phase, "phase transition");
        self.phase = phase;
    }

    /// 全部尝试的步骤结果，按执行顺序
    pub fn trace(&self) -> &[StepResult] {
        &self.trace
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn append_results(&mut self, results: Vec<StepResult>) {
        self.trace.extend(results);
    }

    /// 指定尝试的步骤结果
    pub fn attempt_results(&self, attempt: u32) -> Vec<&StepResult> {
        self.trace.iter().filter(|r| r.attempt == attempt).collect()
    }

    /// 当前尝试的步骤结果
    pub fn current_results(&self) -> Vec<&StepResult> {
        self.attempt_results(self.retry_count)
    }

    /// 全部尝试中调用过的工具（按首次出现顺序去重）
    pub fn tools_used(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for result in &self.trace {
            let name = result.step.display_name();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.trace.iter().filter(|r| !r.is_success())
    }

    pub fn elapsed_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis() - self.started_at
    }

    pub(crate) fn bump_retry_count(&mut self) -> u32 {
        self.retry_count += 1;
        self.retry_count
    }
}
