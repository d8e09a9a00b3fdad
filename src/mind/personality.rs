//! 人格：大五特质（Big Five），每项取值 [-1, 1]

use serde::{Deserialize, Serialize};

use crate::config::PersonalityConfig;
use crate::mind::{Mood, PersonalityModel};

/// 人格系统：由配置构建，配置更新时整体重建
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonalitySystem {
    pub openness: f64,
    pub conscientious: f64,
    pub agreeable: f64,
    pub extrovert: f64,
    pub neurotic: f64,
}

impl PersonalitySystem {
    pub fn from_config(config: &PersonalityConfig) -> Self {
        Self {
            openness: config.open,
            conscientious: config.conscientious,
            agreeable: config.agreeable,
            extrovert: config.extrovert,
            neurotic: config.neurotic,
        }
    }

    /// 基线心境（Mehrabian 大五 → PAD 映射），情绪衰减的目标点
    pub fn baseline_mood(&self) -> Mood {
        let stability = -self.neurotic;
        Mood::new(
            0.21 * self.extrovert + 0.59 * self.agreeable + 0.19 * stability,
            0.15 * self.openness - 0.30 * stability - 0.57 * self.agreeable,
            0.25 * self.openness + 0.17 * self.conscientious + 0.60 * self.extrovert
                - 0.32 * self.agreeable,
        )
    }
}

fn describe_trait(value: f64, high: &str, low: &str) -> Option<String> {
    let degree = match value.abs() {
        v if v >= 0.75 => "very ",
        v if v >= 0.4 => "",
        v if v >= 0.15 => "somewhat ",
        _ => return None,
    };
    let word = if value >= 0.0 { high } else { low };
    Some(format!("{degree}{word}"))
}

impl PersonalityModel for PersonalitySystem {
    fn summary(&self) -> String {
        let traits: Vec<String> = [
            describe_trait(self.openness, "open-minded", "traditional"),
            describe_trait(self.conscientious, "organized", "spontaneous"),
            describe_trait(self.agreeable, "warm", "blunt"),
            describe_trait(self.extrovert, "outgoing", "reserved"),
            describe_trait(self.neurotic, "sensitive", "calm"),
        ]
        .into_iter()
        .flatten()
        .collect();

        if traits.is_empty() {
            "You have a balanced, even-tempered personality.".to_string()
        } else {
            format!("You are {}.", traits.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn personality(o: f64, c: f64, a: f64, e: f64, n: f64) -> PersonalitySystem {
        PersonalitySystem {
            openness: o,
            conscientious: c,
            agreeable: a,
            extrovert: e,
            neurotic: n,
        }
    }

    #[test]
    fn test_summary_mentions_strong_traits() {
        let p = personality(0.7, 0.5, 0.85, 0.4, -0.1);
        let summary = p.summary();
        assert!(summary.contains("very warm"));
        assert!(summary.contains("open-minded"));
        assert!(!summary.contains("sensitive"));
    }

    #[test]
    fn test_neutral_summary() {
        let p = personality(0.0, 0.0, 0.0, 0.0, 0.0);
        assert!(p.summary().contains("balanced"));
    }

    #[test]
    fn test_baseline_is_clamped() {
        let mood = personality(1.0, 1.0, -1.0, 1.0, 1.0).baseline_mood();
        for v in [mood.pleasure, mood.arousal, mood.dominance] {
            assert!((-1.0..=1.0).contains(&v));
        }
    }
}
