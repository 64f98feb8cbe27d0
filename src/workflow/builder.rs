//! 计划构建器
//!
//! 类别 → CategoryProfile（步骤模板 + 合成方式）的注册表；新增类别只需 register，不增加分支。
//! build_plan 每次重新生成计划：general 在需要实时信息时前置 web_search，
//! 重试反馈只作为额外参数注入模型调用步骤，不改变工具集合与顺序。

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::core::AgentError;
use crate::tools::{ASK_SPECIALIST, ROLL_DICE, WEB_SEARCH};
use crate::workflow::classifier::needs_live_info;
use crate::workflow::engine::QUERY_SLOT;
use crate::workflow::types::*;

/// 注入到模型调用步骤的反馈参数名
pub const RETRY_FEEDBACK_PARAM: &str = "retry_feedback";

/// 一个类别的完整配置
#[derive(Debug, Clone)]
pub struct CategoryProfile {
    /// 步骤模板（工具名 + 默认参数）
    pub steps: Vec<WorkflowStep>,
    /// 合成时使用的模型 profile；None 表示工具输出即最终答案
    pub synthesis_profile: Option<String>,
    /// 工具输出是否权威（权威时跳过质量校验）
    pub authoritative: bool,
}

impl CategoryProfile {
    pub fn new(steps: Vec<WorkflowStep>) -> Self {
        Self {
            steps,
            synthesis_profile: None,
            authoritative: false,
        }
    }

    pub fn synthesize_with(mut self, profile: impl Into<String>) -> Self {
        self.synthesis_profile = Some(profile.into());
        self
    }

    /// 工具输出即答案：跳过合成与质量校验
    pub fn authoritative(mut self) -> Self {
        self.authoritative = true;
        self.synthesis_profile = None;
        self
    }
}

fn specialist_step(label: &str, profile: &str, prompt: &str) -> WorkflowStep {
    WorkflowStep::new(ASK_SPECIALIST, label)
        .param("profile", profile)
        .param("prompt", prompt)
}

fn search_step(label: &str) -> WorkflowStep {
    WorkflowStep::new(WEB_SEARCH, label).param("query", QUERY_SLOT)
}

/// 计划构建器：持有类别注册表
#[derive(Debug, Clone, Default)]
pub struct PlanBuilder {
    profiles: HashMap<TaskCategory, CategoryProfile>,
}

impl PlanBuilder {
    /// 创建空注册表（所有类别都会返回 ConfigurationError）
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册类别配置（覆盖同名类别）
    pub fn register(mut self, category: TaskCategory, profile: CategoryProfile) -> Self {
        self.profiles.insert(category, profile);
        self
    }

    /// 内置三类：dice_action / research / general
    pub fn with_default_profiles() -> Self {
        Self::new()
            .register(
                TaskCategory::DiceAction,
                CategoryProfile::new(vec![WorkflowStep::new(ROLL_DICE, "Roll dice")
                    .param("notation", DEFAULT_NOTATION)
                    .param("num_rolls", 1)])
                .authoritative(),
            )
            .register(
                TaskCategory::Research,
                CategoryProfile::new(vec![
                    search_step("Research topic"),
                    specialist_step(
                        "Summarize findings",
                        "summarize",
                        "Question: {query}\n\nWeb Search Results:\n{previous}\n\n\
                         Based on the search results above, provide a comprehensive summary that answers the question.",
                    ),
                    specialist_step(
                        "Explain simply",
                        "explain",
                        "Question: {query}\n\nSummary:\n{previous}\n\n\
                         Explain this in simple, easy-to-understand terms as if teaching someone new to the topic.",
                    ),
                ])
                .synthesize_with("creative"),
            )
            .register(
                TaskCategory::General,
                CategoryProfile::new(vec![specialist_step("Answer question", "general", QUERY_SLOT)])
                    .synthesize_with("general"),
            )
    }

    pub fn profile(&self, category: TaskCategory) -> Result<&CategoryProfile, AgentError> {
        self.profiles.get(&category).ok_or_else(|| {
            AgentError::Configuration(format!("no plan template registered for category '{category}'"))
        })
    }

    /// 为一次尝试生成计划
    pub fn build_plan(
        &self,
        category: TaskCategory,
        query: &str,
        retry_feedback: Option<&str>,
    ) -> Result<ExecutionPlan, AgentError> {
        let profile = self.profile(category)?;
        let mut steps = profile.steps.clone();

        if category == TaskCategory::General && needs_live_info(query) {
            tracing::info!("prepending web_search to general plan (live information needed)");
            steps.insert(0, search_step("Search for current information"));
        }

        for step in &mut steps {
            if step.tool_name == ROLL_DICE {
                let (notation, num_rolls) = parse_dice_request(query);
                step.parameters.insert("notation".into(), notation.into());
                step.parameters.insert("num_rolls".into(), num_rolls.into());
            }
            if let Some(feedback) = retry_feedback.filter(|f| !f.trim().is_empty()) {
                if step.is_model_call() {
                    inject_feedback(step, feedback);
                }
            }
        }

        let plan = ExecutionPlan::new(steps);
        tracing::info!(
            category = %category,
            tools = %plan.describe().join(", "),
            steps = plan.len(),
            retry = retry_feedback.is_some(),
            "plan built"
        );
        Ok(plan)
    }
}

/// 反馈原样存入参数，由执行器在模板解析之后追加到 prompt
fn inject_feedback(step: &mut WorkflowStep, feedback: &str) {
    if step.str_param("prompt").is_none() {
        step.parameters.insert("prompt".into(), QUERY_SLOT.into());
    }
    step.parameters
        .insert(RETRY_FEEDBACK_PARAM.into(), feedback.to_string().into());
}

const DEFAULT_NOTATION: &str = "1d6";

static NOTATION_RE: OnceLock<Regex> = OnceLock::new();
static TIMES_RE: OnceLock<Regex> = OnceLock::new();

/// 从查询中解析骰子记法与次数："roll a dice 5 times" → ("1d6", 5)，"roll 3d6k2" → ("3d6k2", 1)
pub fn parse_dice_request(query: &str) -> (String, u32) {
    let lowered = query.to_lowercase();
    let notation_re = NOTATION_RE.get_or_init(|| Regex::new(r"(\d+d\d+(?:k\d+)?)").unwrap());
    let times_re = TIMES_RE.get_or_init(|| Regex::new(r"(\d+)\s*times?\b").unwrap());

    let notation = notation_re
        .captures(&lowered)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| DEFAULT_NOTATION.to_string());
    let num_rolls = times_re
        .captures(&lowered)
        .and_then(|c| c[1].parse::<u32>().ok())
        .unwrap_or(1);
    (notation, num_rolls)
}
