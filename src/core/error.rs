//! Agent 错误类型
//!
//! 生成失败由 SnapshotGuard 回滚后上报；命令错误只提示用户；存档缺失不是错误（load 返回 None）。

use thiserror::Error;

use crate::llm::LlmError;
use crate::mind::MindError;

/// 编排核心可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 生成后端调用失败（网络、空响应、JSON 解析等），不自动重试
    #[error("Generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("Transcript is empty")]
    EmptyBuffer,

    #[error("Persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 存档版本与当前程序不一致
    #[error("Incompatible saved state: version {found}, expected {expected}")]
    IncompatibleState { found: u32, expected: u32 },

    /// 未知命令或参数个数/类型不对
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Mind(#[from] MindError),
}
