//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SCOUT__*` 覆盖（双下划线表示嵌套，如 `SCOUT__AGENT__MAX_RETRIES=3`）。
//! 配置只在启动时加载一次，之后以 Arc 只读共享。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::AgentError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub agent: AgentSection,
    pub llm: LlmSection,
    pub tools: ToolsSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [agent] 段：质量闸门阈值与重试上限
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    /// 通过所需的最低分（0..=10）
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            quality_threshold: default_quality_threshold(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_quality_threshold() -> f32 {
    7.0
}

fn default_max_retries() -> u32 {
    2
}

/// [llm] 段：后端选择、采样参数与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：deepseek / openai / mock；有无 API Key 也参与决定
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [tools] 段：工具超时、搜索与掷骰限制
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub dice: DiceSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
            search: SearchSection::default(),
            dice: DiceSection::default(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    30
}

/// [tools.search] 段：搜索端点、HTTP 超时、结果条数与截断长度
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSection {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_max_result_chars")]
    pub max_result_chars: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            timeout_secs: default_search_timeout_secs(),
            max_results: default_max_results(),
            max_result_chars: default_max_result_chars(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://api.tavily.com/search".to_string()
}

fn default_search_timeout_secs() -> u64 {
    15
}

fn default_max_results() -> usize {
    5
}

fn default_max_result_chars() -> usize {
    8000
}

/// [tools.dice] 段
#[derive(Debug, Clone, Deserialize)]
pub struct DiceSection {
    #[serde(default = "default_max_dice")]
    pub max_dice: u32,
    #[serde(default = "default_max_sides")]
    pub max_sides: u32,
    #[serde(default = "default_max_rolls")]
    pub max_rolls: u32,
}

impl Default for DiceSection {
    fn default() -> Self {
        Self {
            max_dice: default_max_dice(),
            max_sides: default_max_sides(),
            max_rolls: default_max_rolls(),
        }
    }
}

fn default_max_dice() -> u32 {
    100
}

fn default_max_sides() -> u32 {
    1000
}

fn default_max_rolls() -> u32 {
    20
}

impl AppConfig {
    /// 检查取值范围；不合法时返回配置错误
    pub fn validate(&self) -> Result<(), AgentError> {
        let threshold = self.agent.quality_threshold;
        if !(0.0..=10.0).contains(&threshold) {
            return Err(AgentError::Configuration(format!(
                "agent.quality_threshold must be within [0, 10], got {threshold}"
            )));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AgentError::Configuration(format!(
                "llm.temperature must be within [0, 2], got {}",
                self.llm.temperature
            )));
        }
        if self.llm.max_tokens == 0 {
            return Err(AgentError::Configuration("llm.max_tokens must be positive".into()));
        }
        if self.tools.tool_timeout_secs == 0 {
            return Err(AgentError::Configuration(
                "tools.tool_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// 加载配置，环境变量 SCOUT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SCOUT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        let path = format!("{name}.toml");
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SCOUT")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
