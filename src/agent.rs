//! Agent 运行时
//!
//! 把 AgentState、存档、LLM 后端和待发送的附图绑在一起，供交互循环调用：
//! send 负责带快照保护的一轮对话并在成功后存档，execute 执行斜杠命令。

use futures_util::FutureExt;

use crate::config::{reload_config, AgentConfig, AppConfig};
use crate::core::{
    run_guarded, suggest_responses, AgentError, AgentState, Command, LoadedSession,
    SessionStore, TurnReply, TurnRequest,
};
use crate::llm::Backends;
use crate::mind::{EmotionModel, MemoryModel, RelationshipModel, ThoughtModel};

const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "webp", "bmp", "tiff"];

/// http(s) 链接且路径以常见图片扩展名结尾
pub fn is_image_url(url: &str) -> bool {
    let lower = url.trim().to_lowercase();
    let Some(rest) = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
    else {
        return false;
    };
    let path = rest.split(['?', '#']).next().unwrap_or_default();
    let Some((host, path)) = path.split_once('/') else {
        return false;
    };
    if host.is_empty() {
        return false;
    }
    path.rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// 命令执行结果：需要展示给用户的文本行
pub type CommandOutput = Vec<String>;

pub struct Agent {
    pub state: AgentState,
    config: AppConfig,
    store: SessionStore,
    backends: Backends,
    attached_image: Option<String>,
}

impl Agent {
    /// 加载或新建状态；首次创建时附带问候回复
    pub async fn start(
        config: AppConfig,
        backends: Backends,
    ) -> Result<(Self, Option<TurnReply>), AgentError> {
        config.validate()?;
        let store = SessionStore::new(&config.app.save_path);
        let LoadedSession {
            state,
            is_new,
            greeting,
        } = store.load_or_create(&config, &backends).await?;
        tracing::info!(
            "{} {}",
            state.config.name,
            if is_new { "initialized" } else { "loaded" }
        );
        Ok((
            Self {
                state,
                config,
                store,
                backends,
                attached_image: None,
            },
            greeting,
        ))
    }

    pub fn name(&self) -> &str {
        &self.state.config.name
    }

    pub fn app_config(&self) -> &AppConfig {
        &self.config
    }

    pub fn attached_image(&self) -> Option<&str> {
        self.attached_image.as_deref()
    }

    pub fn has_saved_state(&self) -> bool {
        self.store.exists()
    }

    pub fn save(&self) -> Result<(), AgentError> {
        self.store.save(&self.state)
    }

    /// 一轮对话：失败时状态恢复为发送前；成功后存档并清除附图
    pub async fn send(&mut self, text: &str) -> Result<TurnReply, AgentError> {
        let request = TurnRequest::new(text).with_image(self.attached_image.clone());
        let backends = self.backends.clone();
        let reply = run_guarded(&mut self.state, |s| {
            async move { s.send_message(&backends, request).await }.boxed()
        })
        .await?;

        if let Err(e) = self.save() {
            tracing::warn!("Failed to save state after turn: {}", e);
        }
        self.attached_image = None;
        Ok(reply)
    }

    /// 删除存档并以当前配置重新开始（不发送问候）
    pub fn wipe(&mut self) -> Result<bool, AgentError> {
        let removed = self.store.delete()?;
        if removed {
            self.state = SessionStore::fresh_state(&self.config)?;
            self.attached_image = None;
        }
        Ok(removed)
    }

    /// 重新读取配置并应用到当前状态，然后存档
    pub fn config_update(&mut self) -> Result<(), AgentError> {
        let config = reload_config()?;
        self.apply_agent_config(config.agent)
    }

    /// 只替换 `[agent]` 段；存档路径等 `[app]` 设置在本次运行内保持不变
    pub fn apply_agent_config(&mut self, agent: AgentConfig) -> Result<(), AgentError> {
        self.state.set_config(agent.clone())?;
        self.config.agent = agent;
        self.save()
    }

    pub async fn execute(&mut self, command: Command) -> Result<CommandOutput, AgentError> {
        let output = match command {
            Command::SetPleasure(v) => {
                self.state.emotion.set_mood(Some(v), None, None);
                vec![self.state.emotion.mood_status()]
            }
            Command::SetArousal(v) => {
                self.state.emotion.set_mood(None, Some(v), None);
                vec![self.state.emotion.mood_status()]
            }
            Command::SetDominance(v) => {
                self.state.emotion.set_mood(None, None, Some(v));
                vec![self.state.emotion.mood_status()]
            }
            Command::SetRelationFriendliness(v) => {
                self.state.relationship.set_relation(Some(v), None);
                vec![self.state.relationship.status()]
            }
            Command::SetRelationDominance(v) => {
                self.state.relationship.set_relation(None, Some(v));
                vec![self.state.relationship.status()]
            }
            Command::AddEmotion { label, intensity } => {
                self.state.emotion.experience_emotion(&label, intensity)?;
                vec![self.state.emotion.mood_status()]
            }
            Command::ShowThoughts => {
                self.state.thought.set_show_thoughts(true);
                vec!["Thoughts will be shown.".to_string()]
            }
            Command::HideThoughts => {
                self.state.thought.set_show_thoughts(false);
                vec!["Thoughts will be hidden.".to_string()]
            }
            Command::ResetMood => {
                self.state.emotion.reset_mood();
                vec![self.state.emotion.mood_status()]
            }
            Command::ConsolidateMemories => {
                self.state.memory.consolidate_memories();
                vec!["Short-term memories consolidated.".to_string()]
            }
            Command::AttachImage(url) => {
                if !is_image_url(&url) {
                    return Err(AgentError::MalformedCommand(
                        "Not a valid image url".to_string(),
                    ));
                }
                self.attached_image = Some(url.clone());
                vec![format!("Attached image: {url}")]
            }
            Command::DetachImage => {
                self.attached_image = None;
                vec!["Image detached.".to_string()]
            }
            Command::Memories => {
                let mut lines = vec!["Current memories:".to_string()];
                lines.extend(
                    self.state
                        .memory
                        .short_term_memories()
                        .iter()
                        .map(|m| m.format_memory()),
                );
                lines
            }
            Command::Beliefs => {
                let beliefs = self.state.beliefs();
                if beliefs.is_empty() {
                    vec!["No beliefs have been formed yet".to_string()]
                } else {
                    let mut lines = vec!["The following beliefs have been formed:".to_string()];
                    lines.extend(beliefs.iter().map(|b| format!("- {b}")));
                    lines
                }
            }
            Command::Suggest => {
                let history = self.state.message_history(false);
                let suggestions =
                    suggest_responses(self.backends.chat.as_ref(), self.name(), &history).await?;
                let mut lines = vec!["Possible responses:".to_string()];
                lines.extend(suggestions.iter().map(|s| format!("- {s}")));
                lines
            }
            Command::Wipe => {
                if self.wipe()? {
                    vec!["The AI has been reset.".to_string()]
                } else {
                    vec!["No saved data to erase.".to_string()]
                }
            }
            Command::ConfigUpdate => {
                self.config_update()?;
                vec!["Config updated and saved!".to_string()]
            }
        };
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::llm::MockLlmClient;

    async fn agent_in(dir: &TempDir, mock: Arc<MockLlmClient>) -> Agent {
        let mut config = AppConfig::default();
        config.app.save_path = dir.path().join("state.json");
        let (agent, greeting) = Agent::start(config, Backends::single(mock)).await.unwrap();
        assert!(greeting.is_some());
        agent
    }

    #[test]
    fn test_is_image_url() {
        assert!(is_image_url("https://example.com/cat.PNG"));
        assert!(is_image_url("http://x/y z.png"));
        assert!(is_image_url("https://cdn.site/a/b.jpeg?size=large"));
        assert!(!is_image_url("ftp://example.com/cat.png"));
        assert!(!is_image_url("https://example.com/page.html"));
        assert!(!is_image_url("https://example.com"));
        assert!(!is_image_url("cat.png"));
    }

    #[tokio::test]
    async fn test_attached_image_cleared_after_successful_turn() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockLlmClient::new());
        let mut agent = agent_in(&dir, mock.clone()).await;

        agent
            .execute(Command::AttachImage("https://example.com/cat.png".into()))
            .await
            .unwrap();
        assert!(agent.attached_image().is_some());

        agent.send("what do you see?").await.unwrap();
        assert!(agent.attached_image().is_none());
        // 问候 + 对话 + 图片描述
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_turn_keeps_image_and_state() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockLlmClient::new());
        let mut agent = agent_in(&dir, mock.clone()).await;
        agent
            .execute(Command::AttachImage("https://example.com/cat.png".into()))
            .await
            .unwrap();

        let before = agent.state.clone();
        mock.push_reply(Err(crate::llm::LlmError::Request("timeout".into())));
        assert!(agent.send("hello?").await.is_err());
        assert_eq!(agent.state, before);
        assert_eq!(agent.attached_image(), Some("https://example.com/cat.png"));
    }

    #[tokio::test]
    async fn test_invalid_image_url_rejected() {
        let dir = TempDir::new().unwrap();
        let mut agent = agent_in(&dir, Arc::new(MockLlmClient::new())).await;
        let result = agent
            .execute(Command::AttachImage("not a url".into()))
            .await;
        assert!(matches!(result, Err(AgentError::MalformedCommand(_))));
        assert!(agent.attached_image().is_none());
    }

    #[tokio::test]
    async fn test_unknown_emotion_reported_without_change() {
        let dir = TempDir::new().unwrap();
        let mut agent = agent_in(&dir, Arc::new(MockLlmClient::new())).await;
        let mood = agent.state.emotion.mood();
        let result = agent
            .execute(Command::AddEmotion {
                label: "schadenfreude".into(),
                intensity: 0.5,
            })
            .await;
        assert!(result.is_err());
        assert_eq!(agent.state.emotion.mood(), mood);
    }

    #[tokio::test]
    async fn test_wipe_resets_state_and_removes_file() {
        let dir = TempDir::new().unwrap();
        let mut agent = agent_in(&dir, Arc::new(MockLlmClient::new())).await;
        assert!(agent.has_saved_state());

        let output = agent.execute(Command::Wipe).await.unwrap();
        assert_eq!(output, vec!["The AI has been reset.".to_string()]);
        assert!(!agent.has_saved_state());
        assert_eq!(agent.state.turn_count, 0);
        assert!(agent.state.transcript.is_empty());
    }

    #[tokio::test]
    async fn test_beliefs_and_suggest_output() {
        let dir = TempDir::new().unwrap();
        let mut agent = agent_in(&dir, Arc::new(MockLlmClient::new())).await;

        let output = agent.execute(Command::Beliefs).await.unwrap();
        assert_eq!(output, vec!["No beliefs have been formed yet".to_string()]);

        let output = agent.execute(Command::Suggest).await.unwrap();
        assert_eq!(output[0], "Possible responses:");
        assert_eq!(output.len(), 4);
    }

    #[tokio::test]
    async fn test_apply_agent_config_keeps_app_settings() {
        let dir = TempDir::new().unwrap();
        let mut agent = agent_in(&dir, Arc::new(MockLlmClient::new())).await;
        let app_before = agent.app_config().app.clone();

        let agent_config = AgentConfig {
            name: "Amorelia".into(),
            ..AgentConfig::default()
        };
        agent.apply_agent_config(agent_config).unwrap();

        assert_eq!(agent.name(), "Amorelia");
        assert_eq!(agent.app_config().agent.name, "Amorelia");
        assert_eq!(agent.app_config().app.save_path, app_before.save_path);
        assert_eq!(
            agent.app_config().app.max_context_turns,
            app_before.max_context_turns
        );
        // 仍写入原存档路径
        let saved = SessionStore::new(&app_before.save_path).load().unwrap().unwrap();
        assert_eq!(saved.config.name, "Amorelia");
    }

    #[tokio::test]
    async fn test_start_rejects_zero_context_turns() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.app.save_path = dir.path().join("state.json");
        config.app.max_context_turns = 0;
        let result = Agent::start(config, Backends::single(Arc::new(MockLlmClient::new()))).await;
        assert!(matches!(result, Err(AgentError::InvalidConfig(_))));
        assert!(!dir.path().join("state.json").exists());
    }
}
