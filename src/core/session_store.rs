//! 会话持久化：整个 AgentState 写入单个 JSON 文件
//!
//! 文件格式为带版本号的信封 `{ version, saved_at, state }`；版本不一致时拒绝加载，
//! 不做任何迁移。文件不存在不是错误，load 返回 None。

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::core::pipeline::{TurnReply, TurnRequest};
use crate::core::{run_guarded, AgentError, AgentState};
use crate::llm::Backends;

/// 当前存档格式版本
pub const STATE_VERSION: u32 = 1;

/// 首次创建时发送的问候指令
pub const GREETING_PROMPT: &str = "*User logs in for the first time. Greet them warmly and make sure to introduce yourself, but keep it brief.*";

#[derive(Serialize)]
struct PersistedState<'a> {
    version: u32,
    saved_at: DateTime<Utc>,
    state: &'a AgentState,
}

/// 读取时先只解析信封，确认版本后再解析 state
#[derive(Deserialize)]
struct PersistedEnvelope {
    version: u32,
    #[allow(dead_code)]
    saved_at: DateTime<Utc>,
    state: serde_json::Value,
}

/// load_or_create 的结果
#[derive(Debug)]
pub struct LoadedSession {
    pub state: AgentState,
    pub is_new: bool,
    /// 仅首次创建且问候成功时存在
    pub greeting: Option<TurnReply>,
}

/// 单文件存档
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// 覆盖写入；父目录不存在时自动创建
    pub fn save(&self, state: &AgentState) -> Result<(), AgentError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let persisted = PersistedState {
            version: STATE_VERSION,
            saved_at: Utc::now(),
            state,
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&persisted)?)?;
        tracing::debug!("State saved to {}", self.path.display());
        Ok(())
    }

    /// 文件不存在时返回 Ok(None)
    pub fn load(&self) -> Result<Option<AgentState>, AgentError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path)?;
        let envelope: PersistedEnvelope = serde_json::from_str(&data)?;
        if envelope.version != STATE_VERSION {
            return Err(AgentError::IncompatibleState {
                found: envelope.version,
                expected: STATE_VERSION,
            });
        }
        let state: AgentState = serde_json::from_value(envelope.state)?;
        Ok(Some(state))
    }

    /// 删除存档；返回是否确实删除了文件
    pub fn delete(&self) -> Result<bool, AgentError> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path)?;
        tracing::info!("Saved state removed: {}", self.path.display());
        Ok(true)
    }

    /// 按配置构造全新状态并执行启动流程（不发送问候）
    pub fn fresh_state(config: &AppConfig) -> Result<AgentState, AgentError> {
        let now = Utc::now();
        let mut state = AgentState::with_options(
            config.agent.clone(),
            config.app.max_context_turns,
            config.app.recall_surface_interval_secs,
            now,
        )?;
        state.on_startup(now);
        Ok(state)
    }

    /// 有存档则加载，否则新建；两种情况都执行启动流程。
    /// 仅在首次创建时发送一次问候并存档。
    pub async fn load_or_create(
        &self,
        config: &AppConfig,
        backends: &Backends,
    ) -> Result<LoadedSession, AgentError> {
        if let Some(mut state) = self.load()? {
            tracing::info!("Loaded saved state from {}", self.path.display());
            state.on_startup(Utc::now());
            return Ok(LoadedSession {
                state,
                is_new: false,
                greeting: None,
            });
        }

        tracing::info!("No saved state found, initializing a new agent");
        let mut state = Self::fresh_state(config)?;
        let greeting = run_guarded(&mut state, |s| {
            let backends = backends.clone();
            async move {
                s.send_message(&backends, TurnRequest::new(GREETING_PROMPT))
                    .await
            }
            .boxed()
        })
        .await;

        let greeting = match greeting {
            Ok(reply) => {
                self.save(&state)?;
                Some(reply)
            }
            Err(e) => {
                tracing::warn!("Greeting failed: {}", e);
                None
            }
        };

        Ok(LoadedSession {
            state,
            is_new: true,
            greeting,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::config::AgentConfig;
    use crate::llm::MockLlmClient;
    use crate::memory::Role;
    use crate::mind::MemoryModel;

    fn store_in(dir: &TempDir) -> SessionStore {
        SessionStore::new(dir.path().join("nested").join("state.json"))
    }

    #[test]
    fn test_absent_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.load().unwrap().is_none());
        assert!(!store.delete().unwrap());
    }

    #[test]
    fn test_save_and_load_full_state() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut state = AgentState::new(AgentConfig::default(), Utc::now()).unwrap();
        state.transcript.append(Role::User, "hello");
        state.memory.add_belief("The user likes tea.");
        state.turn_count = 3;

        store.save(&state).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, state);

        assert!(store.delete().unwrap());
        assert!(!store.exists());
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let state = AgentState::new(AgentConfig::default(), Utc::now()).unwrap();
        store.save(&state).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        value["version"] = serde_json::json!(STATE_VERSION + 1);
        std::fs::write(store.path(), value.to_string()).unwrap();

        assert!(matches!(
            store.load(),
            Err(AgentError::IncompatibleState { found, expected })
                if found == STATE_VERSION + 1 && expected == STATE_VERSION
        ));
    }

    #[tokio::test]
    async fn test_first_creation_greets_exactly_once() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mock = Arc::new(MockLlmClient::new());
        let backends = Backends::single(mock.clone());
        let config = AppConfig::default();

        let session = store.load_or_create(&config, &backends).await.unwrap();
        assert!(session.is_new);
        assert!(session.greeting.is_some());
        assert_eq!(mock.call_count(), 1);
        assert_eq!(session.state.transcript.len(), 2);
        assert!(store.exists());

        // 再次加载：不问候，启动流程清空对话记录
        let again = store.load_or_create(&config, &backends).await.unwrap();
        assert!(!again.is_new);
        assert!(again.greeting.is_none());
        assert_eq!(mock.call_count(), 1);
        assert!(again.state.transcript.is_empty());
        assert_eq!(again.state.turn_count, 1);
    }

    #[tokio::test]
    async fn test_failed_greeting_still_returns_state() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let backends = Backends::single(Arc::new(MockLlmClient::failing()));

        let session = store
            .load_or_create(&AppConfig::default(), &backends)
            .await
            .unwrap();
        assert!(session.is_new);
        assert!(session.greeting.is_none());
        assert!(session.state.transcript.is_empty());
        assert_eq!(session.state.turn_count, 0);
        assert!(!store.exists());
    }
}
