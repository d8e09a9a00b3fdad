//! Amorelia - 带人格、情绪与记忆的对话 Agent
//!
//! 模块划分：
//! - **agent**: 运行时（状态 + 存档 + 后端 + 附图），供交互循环调用
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 状态、tick 调度、单轮流水线、快照回滚、持久化、命令解析
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mistral / Mock）
//! - **memory**: 有界对话记录与情景记忆
//! - **mind**: 人格、情绪、关系、思考
//! - **observability**: 日志初始化

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod mind;
pub mod observability;

pub use agent::Agent;
pub use core::{AgentError, AgentState};
