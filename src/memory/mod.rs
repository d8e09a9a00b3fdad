//! 记忆层：有界对话记录（短期上下文）与情景记忆（短期 / 长期记录、信念）

pub mod conversation;
pub mod store;

pub use conversation::{BoundedTranscript, Content, ContentPart, Message, Role};
pub use store::{format_memories_to_string, MemoryRecord, MemorySystem};
