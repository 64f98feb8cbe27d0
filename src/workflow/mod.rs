//! 工作流层：任务分类、计划构建与顺序执行

pub mod builder;
pub mod classifier;
pub mod engine;
pub mod types;

pub use builder::{parse_dice_request, CategoryProfile, PlanBuilder, RETRY_FEEDBACK_PARAM};
pub use classifier::{classify, needs_live_info};
pub use engine::{resolve_params, ExecutionContext, Executor, PREVIOUS_SLOT, QUERY_SLOT};
pub use types::*;
