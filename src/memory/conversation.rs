//! 短期记忆：有界对话记录
//!
//! 保留最近 N 条消息，超出时按 FIFO 丢弃最旧的一条；system 前导（preamble）单独存放，
//! 不参与淘汰，投影为列表时按需插在最前面。

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::AgentError;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 多段内容中的一段：文本或图片引用
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: String },
}

/// 消息内容：纯文本，或少量有序的多段内容（文本 + 图片各至多一段）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Content {
    /// 用户消息附带图片时的两段结构 `[text, image]`
    pub fn with_image(text: impl Into<String>, image_url: impl Into<String>) -> Self {
        Content::Parts(vec![
            ContentPart::Text { text: text.into() },
            ContentPart::ImageUrl {
                image_url: image_url.into(),
            },
        ])
    }

    /// 拆成 (文本, 图片 URL)；多段内容中的文本段按顺序拼接
    pub fn split_image(&self) -> (String, Option<String>) {
        match self {
            Content::Text(text) => (text.clone(), None),
            Content::Parts(parts) => {
                let mut text = String::new();
                let mut image = None;
                for part in parts {
                    match part {
                        ContentPart::Text { text: t } => text.push_str(t),
                        ContentPart::ImageUrl { image_url } => image = Some(image_url.clone()),
                    }
                }
                (text, image)
            }
        }
    }

    /// 仅文本部分（图片段忽略），用于检索与记忆
    pub fn text(&self) -> String {
        self.split_image().0
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Content::Text(s)
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Content::Text(s.to_string())
    }
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
}

impl Message {
    pub fn new(role: Role, content: impl Into<Content>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<Content>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<Content>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<Content>) -> Self {
        Self::new(Role::System, content)
    }
}

/// 有界对话记录：最多 capacity 条消息 + 不会被淘汰的 preamble
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundedTranscript {
    messages: VecDeque<Message>,
    capacity: usize,
    preamble: String,
}

impl BoundedTranscript {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
            preamble: String::new(),
        }
    }

    /// 设置 preamble（去除首尾空白；重复设置同一内容无副作用）
    pub fn set_preamble(&mut self, text: &str) {
        self.preamble = text.trim().to_string();
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 追加一条消息；已满时先丢弃最旧的一条
    pub fn append(&mut self, role: Role, content: impl Into<Content>) {
        if self.capacity == 0 {
            return;
        }
        while self.messages.len() >= self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(Message::new(role, content));
    }

    /// 弹出最近追加的一条消息
    pub fn remove_last(&mut self) -> Result<Message, AgentError> {
        self.messages.pop_back().ok_or(AgentError::EmptyBuffer)
    }

    /// 清空消息，preamble 保留
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    /// 投影为有序列表（副本）；include_preamble 且 preamble 非空时插在首位
    pub fn to_list(&self, include_preamble: bool) -> Vec<Message> {
        let mut history = Vec::with_capacity(self.messages.len() + 1);
        if include_preamble && !self.preamble.is_empty() {
            history.push(Message::system(self.preamble.clone()));
        }
        history.extend(self.messages.iter().cloned());
        history
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
