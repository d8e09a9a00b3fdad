//! Mock LLM 客户端（用于测试与无 API Key 时的本地运行）
//!
//! 默认回显最后一条 User 消息；可预置脚本化回复或注入失败，并记录每次请求供测试断言。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{Generation, LlmClient, LlmError, SamplingOptions};
use crate::memory::{Message, Role};

/// 一次被记录的请求
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub options: SamplingOptions,
}

#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<Generation, LlmError>>>,
    fail_always: bool,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次调用都失败
    pub fn failing() -> Self {
        Self {
            fail_always: true,
            ..Self::default()
        }
    }

    /// 预置下一次调用的结果（按顺序消费）
    pub fn push_reply(&self, reply: Result<Generation, LlmError>) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(
        &self,
        messages: &[Message],
        options: &SamplingOptions,
    ) -> Result<Generation, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedRequest {
                messages: messages.to_vec(),
                options: options.clone(),
            });

        if self.fail_always {
            return Err(LlmError::Unavailable("mock failure".to_string()));
        }
        if let Some(scripted) = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            return scripted;
        }

        let last_user = messages.iter().rev().find(|m| m.role == Role::User);
        let (text, image) = last_user
            .map(|m| m.content.split_image())
            .unwrap_or_else(|| ("(no input)".to_string(), None));
        let first_line = text.lines().next().unwrap_or_default().to_string();

        if options.json {
            return Ok(Generation::Json(serde_json::json!({
                "response": format!("Mock reply to: {first_line}"),
                "possible_responses": ["Hi!", "How are you?", "Tell me more."],
            })));
        }
        if image.is_some() && messages.len() == 1 {
            return Ok(Generation::Text("A mock description of the image.".to_string()));
        }
        Ok(Generation::Text(format!("Mock reply to: {first_line}")))
    }
}
