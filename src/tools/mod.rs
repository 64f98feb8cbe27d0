//! 工具层：Tool trait、注册表、带超时的执行器与内置协作工具（掷骰 / Web 搜索 / 专家模型）

pub mod dice;
pub mod executor;
pub mod registry;
pub mod search;
pub mod specialist;

pub const ROLL_DICE: &str = "roll_dice";
pub const WEB_SEARCH: &str = "web_search";
pub const ASK_SPECIALIST: &str = "ask_specialist";

pub use dice::DiceTool;
pub use executor::{ToolExecutor, ToolInvoker};
pub use registry::{Tool, ToolError, ToolRegistry};
pub use search::WebSearchTool;
pub use specialist::SpecialistTool;
