//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mistral / Mock）实现 LlmClient：输入为角色消息列表（或单条 prompt），
//! 输出为文本或结构化 JSON。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Message;

/// 生成后端错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Model returned invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// 采样参数
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingOptions {
    pub temperature: f32,
    pub presence_penalty: f32,
    pub max_tokens: u32,
    /// 是否要求结构化（JSON）输出
    pub json: bool,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            presence_penalty: 0.0,
            max_tokens: 1024,
            json: false,
        }
    }
}

/// 一次生成的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Text(String),
    Json(serde_json::Value),
}

impl Generation {
    /// 写入对话记录用的文本形式；JSON 以缩进格式序列化
    pub fn to_transcript_text(&self) -> String {
        match self {
            Generation::Text(text) => text.clone(),
            Generation::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Generation::Json(value) => Some(value),
            Generation::Text(_) => None,
        }
    }
}

/// 将模型原始输出按 json 标志解析
pub fn parse_generation(raw: String, json: bool) -> Result<Generation, LlmError> {
    if !json {
        return Ok(Generation::Text(raw));
    }
    let trimmed = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    serde_json::from_str(trimmed)
        .map(Generation::Json)
        .map_err(|e| LlmError::InvalidJson(e.to_string()))
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 以消息列表生成
    async fn generate(
        &self,
        messages: &[Message],
        options: &SamplingOptions,
    ) -> Result<Generation, LlmError>;

    /// 以单条 prompt 生成（包装为一条 user 消息）
    async fn generate_prompt(
        &self,
        prompt: &str,
        options: &SamplingOptions,
    ) -> Result<Generation, LlmError> {
        self.generate(&[Message::user(prompt)], options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_text() {
        let generation = parse_generation("hello".into(), false).unwrap();
        assert_eq!(generation, Generation::Text("hello".into()));
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "```json\n{\"a\": 1}\n```".to_string();
        let generation = parse_generation(raw, true).unwrap();
        assert_eq!(generation.as_json().unwrap()["a"], 1);
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            parse_generation("not json".into(), true),
            Err(LlmError::InvalidJson(_))
        ));
    }
}
