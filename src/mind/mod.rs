//! 心智层：人格、情绪、关系、思考等协作者的接口与内置实现
//!
//! 编排核心只通过这里的 trait 调用协作者；AgentState 持有内置实现（可 Clone / 序列化），
//! 测试可用自定义实现替换。

pub mod emotion;
pub mod personality;
pub mod relationship;
pub mod thought;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::memory::{MemoryRecord, Message};

pub use emotion::{Emotion, EmotionSystem, Mood};
pub use personality::PersonalitySystem;
pub use relationship::{Relation, RelationshipSystem};
pub use thought::{ThoughtBundle, ThoughtSystem};

/// 协作者内部错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MindError {
    #[error("Unknown emotion: {0}")]
    UnknownEmotion(String),

    #[error("Subsystem failure: {0}")]
    Subsystem(String),
}

/// 人格模型：由五个 [-1, 1] 特质构造，对外提供一行摘要
pub trait PersonalityModel {
    fn summary(&self) -> String;
}

/// 情绪模型（PAD 心境）
pub trait EmotionModel {
    /// 周期性衰减；模型自己记录上次更新时间
    fn tick(&mut self, now: DateTime<Utc>) -> Result<(), MindError>;
    fn mood(&self) -> Mood;
    fn reset_mood(&mut self);
    fn set_mood(&mut self, pleasure: Option<f64>, arousal: Option<f64>, dominance: Option<f64>);
    fn experience_emotion(&mut self, label: &str, intensity: f64) -> Result<(), MindError>;
    fn mood_long_description(&self) -> String;
    /// 针对当前心境的行为指引
    fn mood_prompt(&self) -> String;
    /// 调试用的一行心境展示
    fn mood_status(&self) -> String;
}

/// 关系模型
pub trait RelationshipModel {
    fn set_relation(&mut self, friendliness: Option<f64>, dominance: Option<f64>);
    fn relation(&self) -> Relation;
}

/// 记忆模型
pub trait MemoryModel {
    /// 根据对话历史检索：返回 (展示用记忆列表, 原始召回列表)
    fn recall_memories(
        &mut self,
        history: &[Message],
        now: DateTime<Utc>,
    ) -> (Vec<MemoryRecord>, Vec<MemoryRecord>);
    fn remember(&mut self, text: &str, emotion: &Emotion, now: DateTime<Utc>);
    fn beliefs(&self) -> Vec<String>;
    fn add_belief(&mut self, belief: &str);
    fn short_term_memories(&self) -> Vec<MemoryRecord>;
    fn consolidate_memories(&mut self);
    /// 周期性维护：衰减、遗忘、自动巩固
    fn tick(&mut self, elapsed_secs: f64) -> Result<(), MindError>;
    /// 随机唤起若干长期记忆；返回唤起条数
    fn surface_random_thoughts(&mut self, now: DateTime<Utc>) -> usize;
}

/// 思考模型
pub trait ThoughtModel {
    fn think(
        &mut self,
        history: &[Message],
        memories: &[MemoryRecord],
        recalled: &[MemoryRecord],
        last_message_time: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> ThoughtBundle;
    fn can_reflect(&self, now: DateTime<Utc>) -> bool;
    /// 反思，返回新形成的信念
    fn reflect(&mut self, now: DateTime<Utc>) -> Result<Vec<String>, MindError>;
    fn show_thoughts(&self) -> bool;
    fn set_show_thoughts(&mut self, shown: bool);
}
