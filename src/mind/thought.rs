//! 思考：每轮生成内心想法、推断双方情绪，并在积累足够后反思形成信念

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::{Content, MemoryRecord, Message, Role};
use crate::mind::{Emotion, MindError, ThoughtModel};

/// 反思所需的累计情绪强度
const REFLECTION_THRESHOLD: f64 = 3.0;
/// 两次反思之间的最短间隔（分钟）
const REFLECTION_COOLDOWN_MINS: i64 = 10;
/// 同一用户情绪出现多少次后形成信念
const BELIEF_MIN_OCCURRENCES: u32 = 2;

/// 用户情绪关键词
const USER_EMOTION_CUES: &[(&str, &[&str])] = &[
    ("sadness", &["sad", "unhappy", "depressed", "crying", "upset", "heartbroken", "miss"]),
    ("loneliness", &["lonely", "alone", "isolated"]),
    ("joy", &["happy", "glad", "great", "awesome", "excited", "wonderful", "yay"]),
    ("anger", &["angry", "mad", "furious", "annoyed", "hate"]),
    ("anxiety", &["worried", "anxious", "nervous", "stress", "stressed"]),
    ("fear", &["scared", "afraid", "terrified"]),
    ("gratitude", &["thanks", "thank", "grateful", "appreciate"]),
    ("confusion", &["confused", "unsure", "lost"]),
    ("surprise", &["wow", "surprised", "unexpected"]),
];

/// think 的输出
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThoughtBundle {
    pub thoughts: Vec<String>,
    pub emotion: String,
    pub emotion_reason: String,
    pub emotion_object: Emotion,
    pub possible_user_emotions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThoughtSystem {
    show_thoughts: bool,
    reflection_pressure: f64,
    user_emotion_counts: BTreeMap<String, u32>,
    last_reflection: Option<DateTime<Utc>>,
}

impl Default for ThoughtSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ThoughtSystem {
    pub fn new() -> Self {
        Self {
            show_thoughts: false,
            reflection_pressure: 0.0,
            user_emotion_counts: BTreeMap::new(),
            last_reflection: None,
        }
    }
}

fn detect_user_emotions(text: &str) -> Vec<String> {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    USER_EMOTION_CUES
        .iter()
        .filter(|(_, cues)| words.iter().any(|w| cues.contains(&w.as_str())))
        .map(|(label, _)| label.to_string())
        .collect()
}

/// 根据用户情绪决定自身反应：(情绪标签, 原因, 想法)
fn react_to(user_emotions: &[String], text: &str) -> (&'static str, &'static str, &'static str) {
    let primary = user_emotions.first().map(String::as_str);
    match primary {
        Some("sadness") | Some("loneliness") => (
            "compassion",
            "The user seems to be going through something hard.",
            "They seem down. I want to be there for them.",
        ),
        Some("joy") => (
            "joy",
            "The user is sharing something positive.",
            "They sound happy, and that makes me happy too.",
        ),
        Some("anger") | Some("anxiety") | Some("fear") => (
            "concern",
            "The user seems troubled.",
            "Something is bothering them. I should be careful and supportive.",
        ),
        Some("gratitude") => (
            "gratitude",
            "The user expressed appreciation.",
            "It feels nice to be appreciated.",
        ),
        Some("confusion") => (
            "curiosity",
            "The user seems unsure about something.",
            "I want to understand what is confusing them.",
        ),
        Some(_) => (
            "surprise",
            "The user said something unexpected.",
            "That caught me off guard.",
        ),
        None if text.trim_end().ends_with('?') => (
            "curiosity",
            "The user asked a question.",
            "They asked me something; I should answer it directly.",
        ),
        None => (
            "interest",
            "The user is engaging in conversation.",
            "I'm enjoying this conversation.",
        ),
    }
}

impl ThoughtModel for ThoughtSystem {
    fn think(
        &mut self,
        history: &[Message],
        _memories: &[MemoryRecord],
        recalled: &[MemoryRecord],
        last_message_time: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> ThoughtBundle {
        let last_user = history.iter().rev().find(|m| m.role == Role::User);
        let text = last_user.map(|m| m.content.text()).unwrap_or_default();
        let has_image = matches!(
            last_user.map(|m| &m.content),
            Some(Content::Parts(_))
        );

        let user_emotions = detect_user_emotions(&text);
        let (label, reason, reaction) = react_to(&user_emotions, &text);

        let mut intensity = 0.3 + 0.15 * user_emotions.len() as f64;
        if text.contains('!') {
            intensity += 0.1;
        }
        let emotion_object = Emotion::from_label(label, intensity.min(1.0))
            .unwrap_or_else(|_| Emotion::neutral());

        let mut thoughts = vec![reaction.to_string()];
        match last_message_time {
            None => thoughts.push(
                "This is the first time we're talking. I want to make a good impression."
                    .to_string(),
            ),
            Some(last) if now - last > Duration::days(1) => thoughts.push(
                "It's been a while since we last talked. I should acknowledge that.".to_string(),
            ),
            _ => {}
        }
        if !recalled.is_empty() {
            thoughts.push("This reminds me of something we talked about before.".to_string());
        }
        if has_image {
            thoughts.push("They shared an image with me. I should look at it closely.".to_string());
        }

        self.reflection_pressure += emotion_object.intensity;
        for e in &user_emotions {
            *self.user_emotion_counts.entry(e.clone()).or_insert(0) += 1;
        }

        ThoughtBundle {
            thoughts,
            emotion: label.to_string(),
            emotion_reason: reason.to_string(),
            emotion_object,
            possible_user_emotions: user_emotions,
        }
    }

    fn can_reflect(&self, now: DateTime<Utc>) -> bool {
        let cooled_down = self
            .last_reflection
            .map_or(true, |t| now - t >= Duration::minutes(REFLECTION_COOLDOWN_MINS));
        cooled_down && self.reflection_pressure >= REFLECTION_THRESHOLD
    }

    fn reflect(&mut self, now: DateTime<Utc>) -> Result<Vec<String>, MindError> {
        let insights: Vec<String> = self
            .user_emotion_counts
            .iter()
            .filter(|(_, count)| **count >= BELIEF_MIN_OCCURRENCES)
            .map(|(label, _)| format!("The user has often expressed {label} in our conversations."))
            .collect();
        self.reflection_pressure = 0.0;
        self.user_emotion_counts.clear();
        self.last_reflection = Some(now);
        tracing::debug!("Reflection produced {} insights", insights.len());
        Ok(insights)
    }

    fn show_thoughts(&self) -> bool {
        self.show_thoughts
    }

    fn set_show_thoughts(&mut self, shown: bool) {
        self.show_thoughts = shown;
    }
}
