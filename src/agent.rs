//! Agent 装配
//!
//! 按配置选择 LLM 后端、注册协作工具（roll_dice / web_search / ask_specialist），
//! 组装成共享只读依赖的 Orchestrator。

use std::sync::Arc;
use std::time::Duration;

use crate::cognition::LlmScorer;
use crate::config::AppConfig;
use crate::core::{AgentError, Orchestrator};
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::tools::{DiceTool, SpecialistTool, ToolExecutor, ToolRegistry, WebSearchTool};
use crate::workflow::PlanBuilder;

/// 根据配置与环境变量选择 LLM 后端（DeepSeek / OpenAI 兼容 / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    if provider == "mock" {
        tracing::info!("Using Mock LLM (configured)");
        return Arc::new(MockLlmClient::new());
    }

    let has_deepseek_key = std::env::var("DEEPSEEK_API_KEY").is_ok();
    let has_openai_key = std::env::var("OPENAI_API_KEY").is_ok();
    let timeout = Duration::from_secs(cfg.llm.timeouts.request);

    let client = if has_deepseek_key || (provider == "deepseek" && has_openai_key) {
        tracing::info!("Using DeepSeek LLM ({})", cfg.llm.model);
        create_deepseek_client(Some(&cfg.llm.model))
    } else if has_openai_key {
        tracing::info!("Using OpenAI-compatible LLM ({})", cfg.llm.model);
        OpenAiClient::new(
            cfg.llm.base_url.as_deref(),
            &cfg.llm.model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
        )
    } else {
        tracing::warn!("No API key set, using Mock LLM");
        return Arc::new(MockLlmClient::new());
    };

    Arc::new(
        client
            .with_sampling(cfg.llm.temperature, cfg.llm.max_tokens)
            .with_request_timeout(timeout),
    )
}

/// 注册内置协作工具
pub fn build_registry(cfg: &AppConfig, llm: Arc<dyn LlmClient>) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(DiceTool::new(cfg.tools.dice.clone()));
    tools.register(WebSearchTool::from_env(&cfg.tools.search));
    tools.register(SpecialistTool::new(llm));
    tools
}

/// 用给定 LLM 组装编排器
pub fn build_agent_with_llm(cfg: &AppConfig, llm: Arc<dyn LlmClient>) -> Result<Orchestrator, AgentError> {
    cfg.validate()?;
    let registry = build_registry(cfg, llm.clone());
    tracing::info!(tools = %registry.tool_names().join(", "), "tools registered");
    let executor = ToolExecutor::new(registry, cfg.tools.tool_timeout_secs);

    Ok(Orchestrator::new(
        Arc::new(PlanBuilder::with_default_profiles()),
        Arc::new(executor),
        Arc::new(LlmScorer::new(llm)),
        &cfg.agent,
    ))
}

/// 按配置组装编排器；配置不合法时返回 Configuration 错误
pub fn build_agent(cfg: &AppConfig) -> Result<Orchestrator, AgentError> {
    build_agent_with_llm(cfg, create_llm_from_config(cfg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_collaborator_tools() {
        let cfg = AppConfig::default();
        let registry = build_registry(&cfg, Arc::new(MockLlmClient::new()));
        assert_eq!(
            registry.tool_names(),
            vec!["ask_specialist", "roll_dice", "web_search"]
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.agent.quality_threshold = 12.0;
        let result = build_agent_with_llm(&cfg, Arc::new(MockLlmClient::new()));
        assert!(matches!(result, Err(AgentError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_mock_agent_rolls_dice() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".into();
        let agent = build_agent(&cfg).unwrap();
        let state = agent
            .run("roll 2d6", &tokio_util::sync::CancellationToken::new())
            .await
            .unwrap();
        let answer = state.final_answer.unwrap();
        assert!(answer.text.starts_with("🎲 2d6 x1"));
        assert_eq!(answer.quality_score, 10.0);
    }
}
