//! Agent 完整状态：持久化与快照回滚的唯一单元
//!
//! 所有协作者都由 AgentState 独占持有（无共享引用），因此 Clone 即为互不共享的深拷贝。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AgentConfig;
use crate::core::tick::{TickReport, TickScheduler, DEFAULT_SURFACE_INTERVAL_SECS};
use crate::core::AgentError;
use crate::memory::{BoundedTranscript, MemorySystem, Message};
use crate::mind::{EmotionSystem, MemoryModel, PersonalitySystem, RelationshipSystem, ThoughtSystem};

/// 默认对话记录容量
pub const DEFAULT_TRANSCRIPT_CAPACITY: usize = 20;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub config: AgentConfig,
    pub personality: PersonalitySystem,
    pub memory: MemorySystem,
    pub relationship: RelationshipSystem,
    pub emotion: EmotionSystem,
    pub thought: ThoughtSystem,
    pub transcript: BoundedTranscript,
    pub turn_count: u64,
    pub last_message_time: Option<DateTime<Utc>>,
    pub clock: TickScheduler,
}

impl AgentState {
    pub fn new(config: AgentConfig, now: DateTime<Utc>) -> Result<Self, AgentError> {
        Self::with_options(
            config,
            DEFAULT_TRANSCRIPT_CAPACITY,
            DEFAULT_SURFACE_INTERVAL_SECS,
            now,
        )
    }

    pub fn with_options(
        config: AgentConfig,
        transcript_capacity: usize,
        surface_interval_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<Self, AgentError> {
        config.validate()?;
        let personality = PersonalitySystem::from_config(&config.personality);
        let emotion = EmotionSystem::new(&personality, now);
        let mut transcript = BoundedTranscript::new(transcript_capacity);
        transcript.set_preamble(&config.system_prompt);

        Ok(Self {
            config,
            personality,
            memory: MemorySystem::new(),
            relationship: RelationshipSystem::new(),
            emotion,
            thought: ThoughtSystem::new(),
            transcript,
            turn_count: 0,
            last_message_time: None,
            clock: TickScheduler::new(now, surface_interval_secs),
        })
    }

    /// 替换配置：人格整体重建，情绪按新人格重建基线（保留当前心境）
    pub fn set_config(&mut self, config: AgentConfig) -> Result<(), AgentError> {
        config.validate()?;
        let personality = PersonalitySystem::from_config(&config.personality);
        self.emotion = self.emotion.rebuild(&personality);
        self.personality = personality;
        self.transcript.set_preamble(&config.system_prompt);
        self.config = config;
        Ok(())
    }

    /// 启动流程：清空对话、重置时钟、跑一次 tick
    pub fn on_startup(&mut self, now: DateTime<Utc>) -> TickReport {
        self.transcript.clear();
        self.clock.reset_clock(now);
        self.tick(now)
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        self.clock.tick(
            now,
            &mut self.emotion,
            &mut self.thought,
            &mut self.memory,
        )
    }

    pub fn message_history(&self, include_preamble: bool) -> Vec<Message> {
        self.transcript.to_list(include_preamble)
    }

    pub fn beliefs(&self) -> Vec<String> {
        self.memory.beliefs()
    }
}
