//! 快照回滚：深度为 1 的整状态撤销日志
//!
//! 执行有风险的操作前对 AgentState 做一次完整深拷贝；操作失败时用快照整体替换当前状态，
//! 再把错误返回给调用方。成功时直接丢弃快照。

use futures_util::future::BoxFuture;

use crate::core::{AgentError, AgentState};

/// 操作前捕获的状态快照
#[derive(Debug)]
pub struct SnapshotGuard {
    snapshot: AgentState,
}

impl SnapshotGuard {
    pub fn capture(state: &AgentState) -> Self {
        Self {
            snapshot: state.clone(),
        }
    }

    /// 根据操作结果决定回滚或丢弃快照，原样返回结果
    pub fn settle<T>(
        self,
        state: &mut AgentState,
        result: Result<T, AgentError>,
    ) -> Result<T, AgentError> {
        if let Err(e) = &result {
            tracing::warn!("Operation failed, restoring pre-operation state: {}", e);
            *state = self.snapshot;
        }
        result
    }
}

/// 在快照保护下执行 op：失败时 state 恢复为执行前的样子
pub async fn run_guarded<T, F>(state: &mut AgentState, op: F) -> Result<T, AgentError>
where
    F: for<'a> FnOnce(&'a mut AgentState) -> BoxFuture<'a, Result<T, AgentError>>,
{
    let guard = SnapshotGuard::capture(state);
    let result = op(state).await;
    guard.settle(state, result)
}
