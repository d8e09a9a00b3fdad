//! 情绪：PAD（Pleasure / Arousal / Dominance）心境模型
//!
//! 情绪事件把心境推向该情绪的 PAD 坐标；tick 时心境按半衰期指数回落到人格基线。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mind::{EmotionModel, MindError, PersonalitySystem};

/// 心境回落到基线的半衰期（秒）
const MOOD_HALF_LIFE_SECS: f64 = 30.0 * 60.0;

/// 单次情绪事件对心境的最大推动比例
const EMOTION_SENSITIVITY: f64 = 0.5;

/// 情绪词典：标签 → PAD 坐标
const EMOTION_PAD: &[(&str, [f64; 3])] = &[
    ("joy", [0.76, 0.48, 0.35]),
    ("love", [0.87, 0.54, -0.18]),
    ("gratitude", [0.64, 0.16, -0.21]),
    ("interest", [0.64, 0.51, 0.17]),
    ("amusement", [0.45, 0.25, 0.0]),
    ("pride", [0.40, 0.30, 0.30]),
    ("hope", [0.51, 0.23, 0.14]),
    ("relief", [0.73, -0.24, 0.06]),
    ("contentment", [0.45, -0.45, 0.20]),
    ("compassion", [0.40, -0.10, 0.0]),
    ("surprise", [0.40, 0.67, -0.13]),
    ("curiosity", [0.50, 0.45, 0.10]),
    ("neutral", [0.0, 0.0, 0.0]),
    ("confusion", [-0.25, 0.25, -0.30]),
    ("concern", [-0.30, 0.30, -0.10]),
    ("sadness", [-0.63, -0.27, -0.33]),
    ("loneliness", [-0.55, -0.30, -0.40]),
    ("disappointment", [-0.64, -0.17, -0.41]),
    ("fear", [-0.64, 0.60, -0.43]),
    ("anxiety", [-0.50, 0.45, -0.40]),
    ("embarrassment", [-0.50, 0.30, -0.50]),
    ("anger", [-0.51, 0.59, 0.25]),
    ("disgust", [-0.60, 0.35, 0.11]),
];

fn lookup_pad(label: &str) -> Option<[f64; 3]> {
    let label = label.trim().to_lowercase();
    EMOTION_PAD
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, pad)| *pad)
}

/// 心境：三个维度均在 [-1, 1]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Mood {
    pub pleasure: f64,
    pub arousal: f64,
    pub dominance: f64,
}

/// 非有限值按 0 处理，其余截断到 [lo, hi]
pub(crate) fn clamp_finite(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_finite() {
        value.clamp(lo, hi)
    } else {
        0.0
    }
}

impl Mood {
    pub fn new(pleasure: f64, arousal: f64, dominance: f64) -> Self {
        Self {
            pleasure: clamp_finite(pleasure, -1.0, 1.0),
            arousal: clamp_finite(arousal, -1.0, 1.0),
            dominance: clamp_finite(dominance, -1.0, 1.0),
        }
    }

    fn lerp(self, target: Mood, t: f64) -> Mood {
        Mood::new(
            self.pleasure + (target.pleasure - self.pleasure) * t,
            self.arousal + (target.arousal - self.arousal) * t,
            self.dominance + (target.dominance - self.dominance) * t,
        )
    }

    /// 强度：到原点的距离归一化到 [0, 1]
    pub fn intensity(&self) -> f64 {
        let sq = self.pleasure.powi(2) + self.arousal.powi(2) + self.dominance.powi(2);
        (sq.sqrt() / 3f64.sqrt()).min(1.0)
    }

    /// PAD 八分区名称
    pub fn octant(&self) -> &'static str {
        match (
            self.pleasure >= 0.0,
            self.arousal >= 0.0,
            self.dominance >= 0.0,
        ) {
            (true, true, true) => "exuberant",
            (true, true, false) => "dependent",
            (true, false, true) => "relaxed",
            (true, false, false) => "docile",
            (false, true, true) => "hostile",
            (false, true, false) => "anxious",
            (false, false, true) => "disdainful",
            (false, false, false) => "bored",
        }
    }
}

/// 一次情绪体验（思考系统推断出的结构化情绪，也随记忆一起存储）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Emotion {
    pub label: String,
    pub intensity: f64,
    pub pleasure: f64,
    pub arousal: f64,
    pub dominance: f64,
}

impl Emotion {
    pub fn from_label(label: &str, intensity: f64) -> Result<Self, MindError> {
        let [p, a, d] = lookup_pad(label).ok_or_else(|| MindError::UnknownEmotion(label.to_string()))?;
        Ok(Self {
            label: label.trim().to_lowercase(),
            intensity: clamp_finite(intensity, 0.0, 1.0),
            pleasure: p,
            arousal: a,
            dominance: d,
        })
    }

    pub fn neutral() -> Self {
        Self {
            label: "neutral".to_string(),
            intensity: 0.0,
            pleasure: 0.0,
            arousal: 0.0,
            dominance: 0.0,
        }
    }

    fn as_mood(&self) -> Mood {
        Mood::new(self.pleasure, self.arousal, self.dominance)
    }
}

/// 情绪系统：当前心境 + 人格基线 + 自身时钟
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionSystem {
    baseline: Mood,
    mood: Mood,
    last_update: DateTime<Utc>,
}

impl EmotionSystem {
    pub fn new(personality: &PersonalitySystem, now: DateTime<Utc>) -> Self {
        let baseline = personality.baseline_mood();
        Self {
            baseline,
            mood: baseline,
            last_update: now,
        }
    }

    /// 人格变化后重建：新基线，保留当前心境与时钟
    pub fn rebuild(&self, personality: &PersonalitySystem) -> Self {
        Self {
            baseline: personality.baseline_mood(),
            mood: self.mood,
            last_update: self.last_update,
        }
    }

    pub fn baseline(&self) -> Mood {
        self.baseline
    }

    pub fn experience(&mut self, emotion: &Emotion) {
        self.mood = self
            .mood
            .lerp(emotion.as_mood(), emotion.intensity * EMOTION_SENSITIVITY);
    }
}

fn degree(intensity: f64) -> &'static str {
    match intensity {
        i if i >= 0.6 => "very",
        i if i >= 0.3 => "moderately",
        _ => "slightly",
    }
}

impl EmotionModel for EmotionSystem {
    fn tick(&mut self, now: DateTime<Utc>) -> Result<(), MindError> {
        let elapsed = (now - self.last_update).num_milliseconds() as f64 / 1000.0;
        if elapsed > 0.0 {
            let remaining = 0.5f64.powf(elapsed / MOOD_HALF_LIFE_SECS);
            self.mood = self.mood.lerp(self.baseline, 1.0 - remaining);
            self.last_update = now;
        }
        Ok(())
    }

    fn mood(&self) -> Mood {
        self.mood
    }

    fn reset_mood(&mut self) {
        self.mood = self.baseline;
    }

    /// 未指定或非有限的维度保持不变
    fn set_mood(&mut self, pleasure: Option<f64>, arousal: Option<f64>, dominance: Option<f64>) {
        let pick = |value: Option<f64>, current: f64| {
            value.filter(|v| v.is_finite()).unwrap_or(current)
        };
        self.mood = Mood::new(
            pick(pleasure, self.mood.pleasure),
            pick(arousal, self.mood.arousal),
            pick(dominance, self.mood.dominance),
        );
    }

    fn experience_emotion(&mut self, label: &str, intensity: f64) -> Result<(), MindError> {
        let emotion = Emotion::from_label(label, intensity)?;
        self.experience(&emotion);
        Ok(())
    }

    fn mood_long_description(&self) -> String {
        let intensity = self.mood.intensity();
        if intensity < 0.1 {
            return "You are feeling neutral, neither particularly up nor down.".to_string();
        }
        let detail = match self.mood.octant() {
            "exuberant" => "cheerful, energetic and confident",
            "dependent" => "happy and excited, but looking to others for direction",
            "relaxed" => "comfortable, at ease and in control",
            "docile" => "pleasant, calm and easygoing",
            "hostile" => "irritated, tense and confrontational",
            "anxious" => "uneasy, tense and unsure of yourself",
            "disdainful" => "unimpressed, detached and aloof",
            _ => "listless, flat and unmotivated",
        };
        format!(
            "You are feeling {} {}: {}.",
            degree(intensity),
            self.mood.octant(),
            detail
        )
    }

    fn mood_prompt(&self) -> String {
        if self.mood.intensity() < 0.1 {
            return "Respond naturally and in a balanced tone.".to_string();
        }
        match self.mood.octant() {
            "exuberant" => "Let your enthusiasm show; be playful and expressive.",
            "dependent" => "Be warm and eager, and invite the user to share their thoughts.",
            "relaxed" => "Keep a calm, unhurried and reassuring tone.",
            "docile" => "Be gentle and agreeable, and go along with the user's lead.",
            "hostile" => "Your replies may come out short and a little sharp.",
            "anxious" => "Your replies may sound hesitant; you may seek reassurance.",
            "disdainful" => "Keep some distance; your replies may be dry and brief.",
            _ => "Your replies may be low-energy and brief.",
        }
        .to_string()
    }

    fn mood_status(&self) -> String {
        format!(
            "Mood: {} (P={:+.2} A={:+.2} D={:+.2})",
            self.mood.octant(),
            self.mood.pleasure,
            self.mood.arousal,
            self.mood.dominance
        )
    }
}
