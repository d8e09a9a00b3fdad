//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `AMORELIA__*` 覆盖（双下划线表示嵌套，如 `AMORELIA__LLM__PROVIDER=openai`）。
//! `[agent]` 段是随状态一起持久化的 Agent 配置；运行时 `/configupdate` 会重新加载它并重建依赖它的协作者。

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::AgentError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub agent: AgentConfig,
}

/// [app] 段：存档路径、对话条数上限、记忆唤起间隔、开场白
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub save_path: PathBuf,
    /// 对话记录保留条数（短期记忆）
    pub max_context_turns: usize,
    /// 距上次召回超过该秒数时随机唤起记忆
    pub recall_surface_interval_secs: u64,
    /// 每次启动后自动发送的开场消息
    pub opening_scene: Option<String>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from("data/amorelia.json"),
            max_context_turns: 20,
            recall_surface_interval_secs: 2 * 3600,
            opening_scene: None,
        }
    }
}

impl AppSection {
    /// 对话记录至少要容纳一条消息
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.max_context_turns == 0 {
            return Err(AgentError::InvalidConfig(
                "app.max_context_turns must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), AgentError> {
        self.app.validate()?;
        self.agent.validate()
    }
}

/// [llm] 段：后端选择
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：mistral / openai / mock
    pub provider: String,
    pub model: Option<String>,
    /// 图片描述使用的模型，未设置时与 model 相同
    pub vision_model: Option<String>,
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "mistral".to_string(),
            model: None,
            vision_model: None,
            base_url: None,
        }
    }
}

/// 人格特质，每项取值 [-1, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityConfig {
    pub open: f64,
    pub conscientious: f64,
    pub agreeable: f64,
    pub extrovert: f64,
    pub neurotic: f64,
}

impl Default for PersonalityConfig {
    fn default() -> Self {
        Self {
            open: 0.70,
            conscientious: 0.50,
            agreeable: 0.85,
            extrovert: 0.40,
            neurotic: -0.10,
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "Você é o Narrador de um jogo interativo chamado Caminhos do Vilarejo.
Sua função é guiar o jogador pelas histórias do vilarejo, apresentar escolhas e
reagir às decisões do jogador. Use uma linguagem poética e evocativa, como se
estivesse narrando um conto. Sempre descreva o ambiente, os sons e as emoções
que acompanham cada decisão do jogador.";

/// [agent] 段：名字、system prompt、人格。整体替换，不原地修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub system_prompt: String,
    pub personality: PersonalityConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Narrador do vilarejo".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            personality: PersonalityConfig::default(),
        }
    }
}

impl AgentConfig {
    /// 校验：名字非空，人格特质均在 [-1, 1]
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.name.trim().is_empty() {
            return Err(AgentError::InvalidConfig("agent name must not be empty".into()));
        }
        let p = &self.personality;
        let traits = [
            ("open", p.open),
            ("conscientious", p.conscientious),
            ("agreeable", p.agreeable),
            ("extrovert", p.extrovert),
            ("neurotic", p.neurotic),
        ];
        for (name, value) in traits {
            if !(-1.0..=1.0).contains(&value) {
                return Err(AgentError::InvalidConfig(format!(
                    "personality.{name} = {value} is outside [-1.0, 1.0]"
                )));
            }
        }
        Ok(())
    }
}

/// 从 config 目录加载配置，环境变量 AMORELIA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 AMORELIA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, AgentError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("AMORELIA")
            .separator("__")
            .try_parsing(true),
    );

    let cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}

/// 重新从磁盘与环境变量加载配置（`/configupdate` 使用）
pub fn reload_config() -> Result<AppConfig, AgentError> {
    load_config(None)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_agent_config_is_valid() {
        assert!(AgentConfig::default().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_trait_rejected() {
        let mut cfg = AgentConfig::default();
        cfg.personality.neurotic = 1.5;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("neurotic"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let cfg = AgentConfig {
            name: "  ".into(),
            ..AgentConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(AgentError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_context_turns_rejected() {
        let mut cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        cfg.app.max_context_turns = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("max_context_turns"));
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[app]\nmax_context_turns = 8\n\n[agent]\nname = \"Amorelia\"\nsystem_prompt = \"Be kind.\"\n\n[agent.personality]\nopen = 0.1\nconscientious = 0.2\nagreeable = 0.3\nextrovert = 0.4\nneurotic = 0.5"
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.app.max_context_turns, 8);
        assert_eq!(cfg.app.recall_surface_interval_secs, 7200);
        assert_eq!(cfg.agent.name, "Amorelia");
        assert_eq!(cfg.agent.personality.neurotic, 0.5);
    }
}
