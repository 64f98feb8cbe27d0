//! 编排器集成测试：脚本化工具与评分器驱动完整状态机

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use scout::cognition::{QualityGate, QualityScore, QualityScorer};
    use scout::core::{AgentError, Orchestrator, RunPhase};
    use scout::tools::ToolInvoker;
    use scout::workflow::{CategoryProfile, PlanBuilder, StepParams, TaskCategory, WorkflowStep};

    /// 按工具名返回预设结果，并记录每次调用
    #[derive(Default)]
    struct ScriptedInvoker {
        calls: Mutex<Vec<(String, StepParams)>>,
        failing: Vec<&'static str>,
        disconnect_on: Option<&'static str>,
        slow_on: Option<&'static str>,
    }

    impl ScriptedInvoker {
        fn calls(&self) -> Vec<(String, StepParams)> {
            self.calls.lock().unwrap().clone()
        }

        fn tools_called(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .map(|(tool, params)| match params.get("profile").and_then(|p| p.as_str()) {
                    Some(profile) => format!("{tool}({profile})"),
                    None => tool,
                })
                .collect()
        }
    }

    #[async_trait]
    impl ToolInvoker for ScriptedInvoker {
        async fn invoke(&self, tool_name: &str, params: &StepParams) -> Result<String, AgentError> {
            self.calls
                .lock()
                .unwrap()
                .push((tool_name.to_string(), params.clone()));
            if self.slow_on == Some(tool_name) {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            if self.disconnect_on == Some(tool_name) {
                return Err(AgentError::Disconnected("tool server went away".into()));
            }
            if self.failing.iter().any(|f| *f == tool_name) {
                return Err(AgentError::ToolExecutionFailed {
                    tool: tool_name.to_string(),
                    message: "upstream 500".into(),
                });
            }
            Ok(match params.get("profile").and_then(|p| p.as_str()) {
                Some(profile) => format!("{profile} answer"),
                None => format!("{tool_name} output"),
            })
        }
    }

    /// 按顺序给出分数，用完后重复最后一个
    struct SequenceScorer {
        scores: Mutex<VecDeque<QualityScore>>,
        last: QualityScore,
        answers: Mutex<Vec<String>>,
    }

    impl SequenceScorer {
        fn new(scores: Vec<QualityScore>) -> Arc<Self> {
            let last = scores.last().cloned().unwrap_or(QualityScore::new(10.0, None));
            Arc::new(Self {
                scores: Mutex::new(scores.into()),
                last,
                answers: Mutex::new(Vec::new()),
            })
        }

        fn constant(value: f32) -> Arc<Self> {
            Self::new(vec![QualityScore::new(value, None)])
        }

        fn calls(&self) -> usize {
            self.answers.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl QualityScorer for SequenceScorer {
        async fn score(&self, _query: &str, answer: &str) -> Result<QualityScore, AgentError> {
            self.answers.lock().unwrap().push(answer.to_string());
            Ok(self
                .scores
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.last.clone()))
        }
    }

    fn orchestrator(invoker: Arc<ScriptedInvoker>, scorer: Arc<SequenceScorer>) -> Orchestrator {
        Orchestrator::with_gate(
            Arc::new(PlanBuilder::with_default_profiles()),
            invoker,
            QualityGate::new(scorer, 7.0, 2),
        )
    }

    #[tokio::test]
    async fn test_dice_request_bypasses_quality_check() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let scorer = SequenceScorer::constant(0.0);
        let state = orchestrator(invoker.clone(), scorer.clone())
            .run("Roll a dice 5 times", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(state.category, Some(TaskCategory::DiceAction));
        let calls = invoker.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "roll_dice");
        assert_eq!(calls[0].1["notation"], "1d6");
        assert_eq!(calls[0].1["num_rolls"], 5);

        let answer = state.final_answer.as_ref().unwrap();
        assert_eq!(answer.text, "roll_dice output");
        assert_eq!(answer.quality_score, 10.0);
        assert!(!answer.gave_up);
        assert_eq!(scorer.calls(), 0);
        assert_eq!(state.phase, RunPhase::Formatting);
    }

    #[tokio::test]
    async fn test_failed_dice_roll_reports_error_text() {
        let invoker = Arc::new(ScriptedInvoker {
            failing: vec!["roll_dice"],
            ..Default::default()
        });
        let scorer = SequenceScorer::constant(0.0);
        let state = orchestrator(invoker.clone(), scorer.clone())
            .run("roll 2d6", &CancellationToken::new())
            .await
            .unwrap();

        let answer = state.final_answer.as_ref().unwrap();
        assert_eq!(answer.text, "Tool roll_dice failed: upstream 500");
        assert_eq!(answer.quality_score, 10.0);
        assert!(!answer.gave_up);
        assert_eq!(scorer.calls(), 0);
        assert!(state.attempt_results(0)[0].error.is_some());
    }

    #[tokio::test]
    async fn test_research_runs_full_pipeline() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let state = orchestrator(invoker.clone(), SequenceScorer::constant(8.0))
            .run("Research the history of Rust", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(state.category, Some(TaskCategory::Research));
        assert_eq!(
            invoker.tools_called(),
            vec![
                "web_search",
                "ask_specialist(summarize)",
                "ask_specialist(explain)",
                "ask_specialist(creative)",
            ]
        );
        // 上一步输出进入下一步的 prompt
        let calls = invoker.calls();
        assert!(calls[1].1["prompt"].as_str().unwrap().contains("web_search output"));
        assert!(calls[2].1["prompt"].as_str().unwrap().contains("summarize answer"));

        let answer = state.final_answer.as_ref().unwrap();
        assert_eq!(answer.text, "creative answer");
        assert_eq!(answer.quality_score, 8.0);
        assert_eq!(state.retry_count(), 0);
        assert_eq!(state.trace().len(), 3);
    }

    #[tokio::test]
    async fn test_general_query_with_live_keyword_gets_search() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let state = orchestrator(invoker.clone(), SequenceScorer::constant(9.0))
            .run("What is happening with AI today?", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(state.category, Some(TaskCategory::General));
        assert_eq!(
            state.plan.as_ref().unwrap().tool_names(),
            vec!["web_search", "ask_specialist"]
        );
        assert_eq!(state.tools_used(), vec!["web_search", "ask_specialist(general)"]);
    }

    #[tokio::test]
    async fn test_plain_general_query_skips_search() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let state = orchestrator(invoker.clone(), SequenceScorer::constant(9.0))
            .run("What is a monad?", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(state.category, Some(TaskCategory::General));
        assert_eq!(
            invoker.tools_called(),
            vec!["ask_specialist(general)", "ask_specialist(general)"]
        );
    }

    #[tokio::test]
    async fn test_persistent_low_quality_gives_up_after_max_retries() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let scorer = SequenceScorer::constant(3.0);
        let state = orchestrator(invoker.clone(), scorer.clone())
            .run("What is a monad?", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(state.retry_count(), 2);
        assert_eq!(scorer.calls(), 3);
        let answer = state.final_answer.as_ref().unwrap();
        assert!(answer.gave_up);
        assert_eq!(answer.quality_score, 3.0);
        assert_eq!(answer.text, "general answer");

        // trace 保留全部三次尝试
        assert_eq!(state.trace().len(), 3);
        for attempt in 0..3 {
            assert_eq!(state.attempt_results(attempt).len(), 1);
        }
        assert_eq!(state.category, Some(TaskCategory::General));
    }

    #[tokio::test]
    async fn test_zero_retries_delivers_first_answer() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let scorer = SequenceScorer::constant(2.0);
        let state = Orchestrator::with_gate(
            Arc::new(PlanBuilder::with_default_profiles()),
            invoker.clone(),
            QualityGate::new(scorer.clone(), 7.0, 0),
        )
        .run("What is a monad?", &CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(state.retry_count(), 0);
        assert_eq!(scorer.calls(), 1);
        // 一次专家步骤加一次合成，没有第二次尝试
        assert_eq!(
            invoker.tools_called(),
            vec!["ask_specialist(general)", "ask_specialist(general)"]
        );
        let answer = state.final_answer.as_ref().unwrap();
        assert!(answer.gave_up);
        assert_eq!(answer.text, "general answer");
        assert_eq!(state.phase, RunPhase::Formatting);
    }

    #[tokio::test]
    async fn test_retry_feedback_reaches_next_plan() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let scorer = SequenceScorer::new(vec![
            QualityScore::new(4.0, Some("Cite concrete sources".into())),
            QualityScore::new(9.0, None),
        ]);
        let state = orchestrator(invoker.clone(), scorer.clone())
            .run("Research the history of Rust", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(state.retry_count(), 1);
        assert!(!state.final_answer.as_ref().unwrap().gave_up);
        assert_eq!(state.trace().len(), 6);

        let calls = invoker.calls();
        // 第一次尝试：3 步 + 合成；第二次同样的工具顺序
        assert_eq!(calls.len(), 8);
        let first_summary = &calls[1].1;
        assert!(first_summary.get("retry_feedback").is_none());
        let retried_summary = &calls[5].1;
        assert_eq!(retried_summary["retry_feedback"], "Cite concrete sources");
        assert!(retried_summary["prompt"]
            .as_str()
            .unwrap()
            .contains("Cite concrete sources"));
        // 非模型步骤不注入反馈
        assert!(calls[4].1.get("retry_feedback").is_none());
        assert_eq!(calls[4].0, "web_search");
    }

    #[tokio::test]
    async fn test_failed_step_is_recorded_and_run_continues() {
        let invoker = Arc::new(ScriptedInvoker {
            failing: vec!["web_search"],
            ..Default::default()
        });
        let state = orchestrator(invoker.clone(), SequenceScorer::constant(8.0))
            .run("Research the history of Rust", &CancellationToken::new())
            .await
            .unwrap();

        assert!(state.final_answer.is_some());
        let failed: Vec<_> = state.failed_steps().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].step.tool_name, "web_search");
        assert!(failed[0].output.is_none());
        let calls = invoker.calls();
        assert!(calls[1].1["prompt"]
            .as_str()
            .unwrap()
            .contains("(no results from the previous step)"));
    }

    #[tokio::test]
    async fn test_missing_template_is_configuration_error() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let planner = PlanBuilder::new().register(
            TaskCategory::DiceAction,
            CategoryProfile::new(vec![WorkflowStep::new("roll_dice", "Roll dice")]).authoritative(),
        );
        let agent = Orchestrator::with_gate(
            Arc::new(planner),
            invoker.clone(),
            QualityGate::new(SequenceScorer::constant(9.0), 7.0, 2),
        );
        let err = agent
            .run("What is a monad?", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Configuration(_)));
        assert!(invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_plan_still_produces_answer() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let planner = PlanBuilder::new().register(
            TaskCategory::General,
            CategoryProfile::new(vec![]).synthesize_with("general"),
        );
        let agent = Orchestrator::with_gate(
            Arc::new(planner),
            invoker.clone(),
            QualityGate::new(SequenceScorer::constant(9.0), 7.0, 2),
        );
        let state = agent
            .run("What is a monad?", &CancellationToken::new())
            .await
            .unwrap();

        assert!(state.trace().is_empty());
        assert_eq!(state.final_answer.unwrap().text, "general answer");
    }

    #[tokio::test]
    async fn test_disconnect_aborts_run() {
        let invoker = Arc::new(ScriptedInvoker {
            disconnect_on: Some("ask_specialist"),
            ..Default::default()
        });
        let err = orchestrator(invoker, SequenceScorer::constant(9.0))
            .run("Research the history of Rust", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Disconnected(_)));
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_pending_tool_call() {
        let invoker = Arc::new(ScriptedInvoker {
            slow_on: Some("ask_specialist"),
            ..Default::default()
        });
        let agent = orchestrator(invoker, SequenceScorer::constant(9.0));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = agent.run("What is a monad?", &cancel).await.unwrap_err();
        assert_eq!(err, AgentError::Cancelled);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = orchestrator(invoker.clone(), SequenceScorer::constant(9.0))
            .run("Roll 2d6", &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, AgentError::Cancelled);
        assert!(invoker.calls().is_empty());
    }
}
