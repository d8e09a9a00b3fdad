//! 情景记忆：短期 / 长期记忆记录与信念
//!
//! 每轮对话写入一条短期记忆；巩固（consolidate）时转入长期记忆。长期记忆按关键词重叠检索，
//! 强度随时间指数衰减，低于阈值即遗忘。

use std::collections::HashSet;

use chrono::{DateTime, Local, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::memory::{Message, Role};
use crate::mind::{Emotion, MemoryModel, MindError};

/// 短期记忆超过该条数时自动巩固
const SHORT_TERM_LIMIT: usize = 12;
/// 距上次巩固超过该时长（秒）时自动巩固
const CONSOLIDATE_AFTER_SECS: f64 = 6.0 * 3600.0;
/// 长期记忆强度半衰期（秒）
const LONG_TERM_HALF_LIFE_SECS: f64 = 7.0 * 24.0 * 3600.0;
/// 强度低于此值的长期记忆被遗忘
const FORGET_THRESHOLD: f64 = 0.05;
/// 单次召回的长期记忆上限
const RECALL_LIMIT: usize = 5;
/// 检索时参考的最近消息条数
const RECALL_CONTEXT_MESSAGES: usize = 3;
/// 每次随机唤起的长期记忆条数
const SURFACE_COUNT: usize = 2;
const MAX_STRENGTH: f64 = 3.0;

/// 一条记忆
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: Uuid,
    pub content: String,
    pub emotion: Emotion,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub strength: f64,
    pub recall_count: u32,
}

impl MemoryRecord {
    pub fn new(content: impl Into<String>, emotion: Emotion, now: DateTime<Utc>) -> Self {
        let strength = 1.0 + emotion.intensity;
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            emotion,
            created_at: now,
            last_accessed: now,
            strength,
            recall_count: 0,
        }
    }

    /// 展示格式：时间 + 情绪 + 内容
    pub fn format_memory(&self) -> String {
        let when = self.created_at.with_timezone(&Local);
        format!(
            "<memory timestamp=\"{}\" emotion=\"{}\">\n{}\n</memory>",
            when.format("%a, %m/%d/%Y %I:%M %p"),
            self.emotion.label,
            self.content
        )
    }
}

/// 多条记忆拼为文本；为空时返回 fallback
pub fn format_memories_to_string(memories: &[MemoryRecord], fallback: &str) -> String {
    if memories.is_empty() {
        return fallback.to_string();
    }
    memories
        .iter()
        .map(MemoryRecord::format_memory)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 将文本切分为小写词集合，用于简单相似度（词重叠数）
fn tokenize_lower(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|w| w.to_lowercase())
        .filter(|w| w.chars().count() > 2)
        .collect()
}

/// 记忆系统
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySystem {
    short_term: Vec<MemoryRecord>,
    long_term: Vec<MemoryRecord>,
    beliefs: Vec<String>,
    secs_since_consolidation: f64,
}

impl MemorySystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn long_term_memories(&self) -> &[MemoryRecord] {
        &self.long_term
    }
}

impl MemoryModel for MemorySystem {
    fn recall_memories(
        &mut self,
        history: &[Message],
        now: DateTime<Utc>,
    ) -> (Vec<MemoryRecord>, Vec<MemoryRecord>) {
        let query: String = history
            .iter()
            .filter(|m| m.role != Role::System)
            .rev()
            .take(RECALL_CONTEXT_MESSAGES)
            .map(|m| m.content.text())
            .collect::<Vec<_>>()
            .join(" ");
        let query_tokens = tokenize_lower(&query);

        let mut scored: Vec<(usize, usize)> = self
            .long_term
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                let overlap = query_tokens
                    .intersection(&tokenize_lower(&record.content))
                    .count();
                (overlap, idx)
            })
            .filter(|(overlap, _)| *overlap > 0)
            .collect();
        scored.sort_by(|a, b| {
            b.0.cmp(&a.0).then_with(|| {
                self.long_term[b.1]
                    .strength
                    .total_cmp(&self.long_term[a.1].strength)
            })
        });

        let mut recalled = Vec::new();
        for (_, idx) in scored.into_iter().take(RECALL_LIMIT) {
            let record = &mut self.long_term[idx];
            record.recall_count += 1;
            record.last_accessed = now;
            record.strength = (record.strength + 0.2).min(MAX_STRENGTH);
            recalled.push(record.clone());
        }

        let short_ids: HashSet<Uuid> = self.short_term.iter().map(|r| r.id).collect();
        let mut display: Vec<MemoryRecord> = self.short_term.clone();
        display.extend(
            recalled
                .iter()
                .filter(|r| !short_ids.contains(&r.id))
                .cloned(),
        );
        display.sort_by_key(|r| r.created_at);

        (display, recalled)
    }

    fn remember(&mut self, text: &str, emotion: &Emotion, now: DateTime<Utc>) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.short_term
            .push(MemoryRecord::new(text, emotion.clone(), now));
    }

    fn beliefs(&self) -> Vec<String> {
        self.beliefs.clone()
    }

    fn add_belief(&mut self, belief: &str) {
        let belief = belief.trim();
        if belief.is_empty() || self.beliefs.iter().any(|b| b == belief) {
            return;
        }
        self.beliefs.push(belief.to_string());
    }

    fn short_term_memories(&self) -> Vec<MemoryRecord> {
        self.short_term.clone()
    }

    fn consolidate_memories(&mut self) {
        for record in self.short_term.drain(..) {
            match self.long_term.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => {
                    existing.strength = existing.strength.max(record.strength);
                    existing.last_accessed = existing.last_accessed.max(record.last_accessed);
                }
                None => self.long_term.push(record),
            }
        }
        self.secs_since_consolidation = 0.0;
    }

    fn tick(&mut self, elapsed_secs: f64) -> Result<(), MindError> {
        if !elapsed_secs.is_finite() {
            return Err(MindError::Subsystem(format!(
                "invalid elapsed time: {elapsed_secs}"
            )));
        }
        if elapsed_secs <= 0.0 {
            return Ok(());
        }

        let factor = 0.5f64.powf(elapsed_secs / LONG_TERM_HALF_LIFE_SECS);
        for record in &mut self.long_term {
            record.strength *= factor;
        }
        let before = self.long_term.len();
        self.long_term.retain(|r| r.strength >= FORGET_THRESHOLD);
        let forgotten = before - self.long_term.len();
        if forgotten > 0 {
            tracing::debug!("Forgot {} faded memories", forgotten);
        }

        self.secs_since_consolidation += elapsed_secs;
        let overdue = self.secs_since_consolidation >= CONSOLIDATE_AFTER_SECS;
        if self.short_term.len() > SHORT_TERM_LIMIT || (overdue && !self.short_term.is_empty()) {
            tracing::debug!("Auto-consolidating {} short-term memories", self.short_term.len());
            self.consolidate_memories();
        }
        Ok(())
    }

    fn surface_random_thoughts(&mut self, now: DateTime<Utc>) -> usize {
        let short_ids: HashSet<Uuid> = self.short_term.iter().map(|r| r.id).collect();
        let candidates: Vec<&MemoryRecord> = self
            .long_term
            .iter()
            .filter(|r| !short_ids.contains(&r.id))
            .collect();
        let surfaced: Vec<MemoryRecord> = candidates
            .choose_multiple(&mut rand::thread_rng(), SURFACE_COUNT)
            .map(|r| {
                let mut record = (*r).clone();
                record.last_accessed = now;
                record
            })
            .collect();
        let count = surfaced.len();
        self.short_term.extend(surfaced);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joy() -> Emotion {
        Emotion::from_label("joy", 0.5).unwrap()
    }

    #[test]
    fn test_remember_goes_to_short_term() {
        let mut memory = MemorySystem::new();
        memory.remember("User: I love hiking\n\nAI: Nice!", &joy(), Utc::now());
        memory.remember("   ", &joy(), Utc::now());
        assert_eq!(memory.short_term_memories().len(), 1);
        assert!(memory.long_term_memories().is_empty());
    }

    #[test]
    fn test_consolidate_moves_everything() {
        let mut memory = MemorySystem::new();
        let now = Utc::now();
        memory.remember("first", &joy(), now);
        memory.remember("second", &joy(), now);
        memory.consolidate_memories();
        assert!(memory.short_term_memories().is_empty());
        assert_eq!(memory.long_term_memories().len(), 2);
    }

    #[test]
    fn test_recall_matches_keywords() {
        let mut memory = MemorySystem::new();
        let now = Utc::now();
        memory.remember("User: my dog Biscuit loves the beach", &joy(), now);
        memory.remember("User: I work as a nurse", &joy(), now);
        memory.consolidate_memories();
        memory.remember("User: what a day", &joy(), now);

        let history = vec![
            Message::system("preamble mentioning beach"),
            Message::user("Biscuit and I went to the beach again"),
        ];
        let (display, recalled) = memory.recall_memories(&history, now);
        assert_eq!(recalled.len(), 1);
        assert!(recalled[0].content.contains("Biscuit"));
        assert_eq!(recalled[0].recall_count, 1);
        // 短期记忆 + 召回
        assert_eq!(display.len(), 2);
    }

    #[test]
    fn test_tick_zero_elapsed_changes_nothing() {
        let mut memory = MemorySystem::new();
        memory.remember("something", &joy(), Utc::now());
        memory.consolidate_memories();
        let before = memory.clone();
        memory.tick(0.0).unwrap();
        assert_eq!(memory, before);
    }

    #[test]
    fn test_tick_forgets_faded_memories() {
        let mut memory = MemorySystem::new();
        memory.remember("old news", &Emotion::neutral(), Utc::now());
        memory.consolidate_memories();
        memory.tick(LONG_TERM_HALF_LIFE_SECS * 10.0).unwrap();
        assert!(memory.long_term_memories().is_empty());
    }

    #[test]
    fn test_tick_auto_consolidates_when_overdue() {
        let mut memory = MemorySystem::new();
        memory.remember("pending", &joy(), Utc::now());
        memory.tick(CONSOLIDATE_AFTER_SECS + 1.0).unwrap();
        assert!(memory.short_term_memories().is_empty());
        assert_eq!(memory.long_term_memories().len(), 1);
    }

    #[test]
    fn test_tick_rejects_non_finite_elapsed() {
        let mut memory = MemorySystem::new();
        assert!(memory.tick(f64::NAN).is_err());
    }

    #[test]
    fn test_surface_random_thoughts_does_not_duplicate_on_consolidate() {
        let mut memory = MemorySystem::new();
        let now = Utc::now();
        for i in 0..4 {
            memory.remember(&format!("memory {i}"), &joy(), now);
        }
        memory.consolidate_memories();
        assert_eq!(memory.surface_random_thoughts(now), 2);
        assert_eq!(memory.short_term_memories().len(), 2);
        memory.consolidate_memories();
        assert_eq!(memory.long_term_memories().len(), 4);
    }

    #[test]
    fn test_beliefs_are_deduplicated() {
        let mut memory = MemorySystem::new();
        memory.add_belief("The user likes dogs");
        memory.add_belief(" The user likes dogs ");
        memory.add_belief("");
        assert_eq!(memory.beliefs(), vec!["The user likes dogs".to_string()]);
    }

    #[test]
    fn test_format_memories_fallback() {
        assert_eq!(format_memories_to_string(&[], "nothing yet"), "nothing yet");
    }
}
