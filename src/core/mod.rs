//! 核心编排层：状态、tick 调度、单轮流水线、快照回滚、持久化、命令解析

pub mod command;
pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod session_store;
pub mod snapshot;
pub mod state;
pub mod tick;

pub use command::{parse_command, Arg, Command, ParsedCommand};
pub use error::AgentError;
pub use pipeline::{describe_image, suggest_responses, turn_sampling, TurnReply, TurnRequest};
pub use session_store::{LoadedSession, SessionStore, GREETING_PROMPT, STATE_VERSION};
pub use snapshot::{run_guarded, SnapshotGuard};
pub use state::{AgentState, DEFAULT_TRANSCRIPT_CAPACITY};
pub use tick::{TickReport, TickScheduler, DEFAULT_SURFACE_INTERVAL_SECS};
