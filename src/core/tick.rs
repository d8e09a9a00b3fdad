//! 时间驱动调度：每次交互前后与空闲时推进情绪、反思、记忆
//!
//! 单个子系统失败只记日志，不会中断本次 tick；last_tick_time 无条件推进，
//! 避免某个子系统持续失败导致 elapsed 无限增长。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mind::{EmotionModel, MemoryModel, ThoughtModel};

/// 默认：距上次召回超过 2 小时随机唤起记忆
pub const DEFAULT_SURFACE_INTERVAL_SECS: u64 = 2 * 3600;

/// 单次 tick 的结果（供日志与测试）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub elapsed_secs: f64,
    pub beliefs_formed: usize,
    pub reflected: bool,
    pub surfaced: Option<usize>,
    /// 失败的子系统及原因
    pub failures: Vec<String>,
}

/// 调度器时钟（随 AgentState 一起持久化）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickScheduler {
    pub last_tick_time: DateTime<Utc>,
    pub last_recall_tick_time: DateTime<Utc>,
    pub surface_interval_secs: u64,
}

impl TickScheduler {
    pub fn new(now: DateTime<Utc>, surface_interval_secs: u64) -> Self {
        Self {
            last_tick_time: now,
            last_recall_tick_time: now,
            surface_interval_secs,
        }
    }

    /// 启动时重置时钟，避免把进程停止的时间算作一次巨大的 elapsed
    pub fn reset_clock(&mut self, now: DateTime<Utc>) {
        self.last_tick_time = now;
    }

    /// 记录一次召回（用户发消息）
    pub fn mark_recall(&mut self, now: DateTime<Utc>) {
        self.last_recall_tick_time = now;
    }

    pub fn tick(
        &mut self,
        now: DateTime<Utc>,
        emotion: &mut dyn EmotionModel,
        thought: &mut dyn ThoughtModel,
        memory: &mut dyn MemoryModel,
    ) -> TickReport {
        let elapsed = ((now - self.last_tick_time).num_milliseconds() as f64 / 1000.0).max(0.0);
        let mut report = TickReport {
            elapsed_secs: elapsed,
            ..TickReport::default()
        };

        if let Err(e) = emotion.tick(now) {
            tracing::warn!("Emotion tick failed: {}", e);
            report.failures.push(format!("emotion: {e}"));
        }

        if thought.can_reflect(now) {
            match thought.reflect(now) {
                Ok(beliefs) => {
                    report.reflected = true;
                    report.beliefs_formed = beliefs.len();
                    for belief in &beliefs {
                        memory.add_belief(belief);
                    }
                }
                Err(e) => {
                    tracing::warn!("Reflection failed: {}", e);
                    report.failures.push(format!("thought: {e}"));
                }
            }
        }

        if let Err(e) = memory.tick(elapsed) {
            tracing::warn!("Memory tick failed: {}", e);
            report.failures.push(format!("memory: {e}"));
        }

        let since_recall = (now - self.last_recall_tick_time).num_seconds();
        if since_recall > self.surface_interval_secs as i64 {
            let count = memory.surface_random_thoughts(now);
            tracing::info!("Random thoughts surfaced ({} memories)", count);
            report.surfaced = Some(count);
            self.last_recall_tick_time = now;
        }

        self.last_tick_time = now;
        report
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::memory::{MemoryRecord, MemorySystem, Message};
    use crate::mind::{
        Emotion, EmotionSystem, MindError, Mood, PersonalitySystem, ThoughtSystem,
    };

    fn collaborators(now: DateTime<Utc>) -> (EmotionSystem, ThoughtSystem, MemorySystem) {
        let personality = PersonalitySystem {
            openness: 0.7,
            conscientious: 0.5,
            agreeable: 0.85,
            extrovert: 0.4,
            neurotic: -0.1,
        };
        (
            EmotionSystem::new(&personality, now),
            ThoughtSystem::new(),
            MemorySystem::new(),
        )
    }

    /// 所有维护操作都失败的记忆模型
    #[derive(Default)]
    struct BrokenMemory {
        surfaced: usize,
    }

    impl MemoryModel for BrokenMemory {
        fn recall_memories(
            &mut self,
            _history: &[Message],
            _now: DateTime<Utc>,
        ) -> (Vec<MemoryRecord>, Vec<MemoryRecord>) {
            (Vec::new(), Vec::new())
        }
        fn remember(&mut self, _text: &str, _emotion: &Emotion, _now: DateTime<Utc>) {}
        fn beliefs(&self) -> Vec<String> {
            Vec::new()
        }
        fn add_belief(&mut self, _belief: &str) {}
        fn short_term_memories(&self) -> Vec<MemoryRecord> {
            Vec::new()
        }
        fn consolidate_memories(&mut self) {}
        fn tick(&mut self, _elapsed_secs: f64) -> Result<(), MindError> {
            Err(MindError::Subsystem("disk on fire".into()))
        }
        fn surface_random_thoughts(&mut self, _now: DateTime<Utc>) -> usize {
            self.surfaced += 1;
            0
        }
    }

    struct BrokenEmotion;

    impl EmotionModel for BrokenEmotion {
        fn tick(&mut self, _now: DateTime<Utc>) -> Result<(), MindError> {
            Err(MindError::Subsystem("clock drift".into()))
        }
        fn mood(&self) -> Mood {
            Mood::default()
        }
        fn reset_mood(&mut self) {}
        fn set_mood(&mut self, _p: Option<f64>, _a: Option<f64>, _d: Option<f64>) {}
        fn experience_emotion(&mut self, _label: &str, _intensity: f64) -> Result<(), MindError> {
            Ok(())
        }
        fn mood_long_description(&self) -> String {
            String::new()
        }
        fn mood_prompt(&self) -> String {
            String::new()
        }
        fn mood_status(&self) -> String {
            String::new()
        }
    }

    #[test]
    fn test_second_tick_at_same_instant_is_noop() {
        let start = Utc::now();
        let (mut emotion, mut thought, mut memory) = collaborators(start);
        emotion.set_mood(Some(-0.9), Some(0.9), Some(-0.9));
        memory.remember("something happened", &Emotion::neutral(), start);
        memory.consolidate_memories();
        let mut scheduler = TickScheduler::new(start, DEFAULT_SURFACE_INTERVAL_SECS);

        let later = start + Duration::minutes(30);
        let first = scheduler.tick(later, &mut emotion, &mut thought, &mut memory);
        assert_eq!(first.elapsed_secs, 1800.0);

        let (mood, mem) = (emotion.mood(), memory.clone());
        let second = scheduler.tick(later, &mut emotion, &mut thought, &mut memory);
        assert_eq!(second.elapsed_secs, 0.0);
        assert_eq!(emotion.mood(), mood);
        assert_eq!(memory, mem);
    }

    #[test]
    fn test_failing_subsystems_do_not_block_clock() {
        let start = Utc::now();
        let (_, mut thought, _) = collaborators(start);
        let mut emotion = BrokenEmotion;
        let mut memory = BrokenMemory::default();
        let mut scheduler = TickScheduler::new(start, DEFAULT_SURFACE_INTERVAL_SECS);

        let t1 = start + Duration::seconds(60);
        let report = scheduler.tick(t1, &mut emotion, &mut thought, &mut memory);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(scheduler.last_tick_time, t1);

        let t2 = t1 + Duration::seconds(60);
        let report = scheduler.tick(t2, &mut emotion, &mut thought, &mut memory);
        assert_eq!(report.elapsed_secs, 60.0);
    }

    #[test]
    fn test_surfaces_memories_after_idle_interval() {
        let start = Utc::now();
        let (mut emotion, mut thought, _) = collaborators(start);
        let mut memory = BrokenMemory::default();
        let mut scheduler = TickScheduler::new(start, DEFAULT_SURFACE_INTERVAL_SECS);

        let report = scheduler.tick(
            start + Duration::seconds(7200),
            &mut emotion,
            &mut thought,
            &mut memory,
        );
        assert_eq!(report.surfaced, None);

        let later = start + Duration::seconds(7201);
        let report = scheduler.tick(later, &mut emotion, &mut thought, &mut memory);
        assert_eq!(report.surfaced, Some(0));
        assert_eq!(memory.surfaced, 1);
        assert_eq!(scheduler.last_recall_tick_time, later);
    }

    #[test]
    fn test_reflection_beliefs_reach_memory() {
        let now = Utc::now();
        let (mut emotion, mut thought, mut memory) = collaborators(now);
        for _ in 0..6 {
            let history = vec![Message::user("I'm so lonely and sad, I miss everyone!")];
            thought.think(&history, &[], &[], Some(now), now);
        }
        let mut scheduler = TickScheduler::new(now, DEFAULT_SURFACE_INTERVAL_SECS);
        let report = scheduler.tick(now, &mut emotion, &mut thought, &mut memory);
        assert!(report.reflected);
        assert!(!memory.beliefs().is_empty());
    }
}
