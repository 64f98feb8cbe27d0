//! 会话监管：取消令牌与 Ctrl+C
//!
//! 每次运行持有一个 CancellationToken；run_cancellable 让任意能力调用与取消信号竞争，
//! 取消后立即返回 AgentError::Cancelled，不产生部分答案。

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::core::AgentError;

/// 会话级取消管理
#[derive(Debug, Default)]
pub struct SessionSupervisor {
    cancel_token: CancellationToken,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 创建子 token（用于单次运行）
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    /// 后台监听 Ctrl+C，收到后取消全部运行
    pub fn install_ctrl_c_handler(&self) {
        let token = self.cancel_token.clone();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                tracing::info!("Received Ctrl+C, cancelling run");
                token.cancel();
            }
        });
    }
}

/// 让 fut 与取消信号竞争；取消优先
pub async fn run_cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, AgentError>
where
    F: Future<Output = Result<T, AgentError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AgentError::Cancelled),
        res = fut => res,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completes_when_not_cancelled() {
        let token = CancellationToken::new();
        let out = run_cancellable(&token, async { Ok::<_, AgentError>(42) }).await;
        assert_eq!(out, Ok(42));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_call() {
        let supervisor = SessionSupervisor::new();
        let token = supervisor.child_token();
        let slow = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, AgentError>("late")
        };
        let canceller = {
            let parent = supervisor.cancel_token();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                parent.cancel();
            }
        };
        let (out, _) = tokio::join!(run_cancellable(&token, slow), canceller);
        assert_eq!(out, Err(AgentError::Cancelled));
        assert!(token.is_cancelled());
    }
}
