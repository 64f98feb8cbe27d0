//! 核心编排层：错误类型、运行状态、重试处理、取消与有界状态机

pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod session_supervisor;
pub mod state;

pub use error::AgentError;
pub use orchestrator::Orchestrator;
pub use retry::{default_feedback, prepare_retry};
pub use session_supervisor::{run_cancellable, SessionSupervisor};
pub use state::{FinalAnswer, RunPhase, RunState};
