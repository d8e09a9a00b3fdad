//! 单轮消息处理流水线
//!
//! 顺序：tick → 追加用户消息 → 召回记忆 → 思考 → 渲染 prompt → 生成 → 写入记忆 → tick → 追加回复。
//! 流水线本身不做回滚；调用方用 [`run_guarded`](crate::core::run_guarded) 包裹，失败时整体恢复。

use chrono::{DateTime, Local, Utc};

use crate::core::prompt::{
    fill_template, render_user_prompt, PromptContext, IMAGE_ATTACHED_MARKER,
};
use crate::core::{AgentError, AgentState};
use crate::llm::{Backends, Generation, LlmClient, LlmError, SamplingOptions};
use crate::memory::{Content, ContentPart, Message, Role};
use crate::mind::{EmotionModel, MemoryModel, PersonalityModel, ThoughtModel};

const DESCRIBE_IMAGE_PROMPT: &str = "Please describe in detail what you see in this image. \
Make sure to include specific details, such as style, colors, etc.";

const SUGGEST_TEMPLATE: &str = "# Task
The human is chatting with {name}, a friendly and empathetic virtual companion.
It aims to connect on a deeper level, and is good at providing emotional support when needed.
Given the following conversation, please suggest 3 to 5 possible responses that the HUMAN could respond to the last AI message given the conversation context.
Try to match the human's tone and style as closely as possible.

# Role descriptions
- **HUMAN**: These are messages from the human
- **AI**: These are responses from the AI model

# Format Instructions
Respond in JSON format:
```
{
\t\"possible_responses\": list[str]  // The list of responses that the USER might give, based on the conversation context
}
```

# Conversation History
Today is {date}. The current time is {time}

Here is the conversation history so far:

```
{conversation_history}
```

Remember, try to match the human's tone and style as closely as possible.

Possible **HUMAN** responses:";

/// 对话轮次的采样参数：高温度 + presence penalty
pub fn turn_sampling(structured: bool) -> SamplingOptions {
    SamplingOptions {
        temperature: 1.0,
        presence_penalty: 1.0,
        max_tokens: 2048,
        json: structured,
    }
}

/// 一轮输入
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnRequest {
    pub text: String,
    pub image_url: Option<String>,
    /// 要求结构化（JSON）回复
    pub structured: bool,
}

impl TurnRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_image(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    pub fn structured(mut self, structured: bool) -> Self {
        self.structured = structured;
        self
    }
}

/// 一轮输出
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub response: Generation,
    /// 仅在开启 show_thoughts 时返回
    pub thoughts: Option<Vec<String>>,
}

impl TurnReply {
    /// 展示用文本；结构化回复优先取 `response` 字段
    pub fn display_text(&self) -> String {
        match &self.response {
            Generation::Json(value) => value
                .get("response")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| self.response.to_transcript_text()),
            Generation::Text(text) => text.clone(),
        }
    }
}

impl AgentState {
    /// 处理一条用户消息
    pub async fn send_message(
        &mut self,
        backends: &Backends,
        request: TurnRequest,
    ) -> Result<TurnReply, AgentError> {
        let now = Utc::now();
        self.tick(now);
        self.clock.mark_recall(now);
        self.transcript.set_preamble(&self.config.system_prompt);

        let content = match &request.image_url {
            Some(url) => Content::with_image(request.text.clone(), url.clone()),
            None => Content::from(request.text.clone()),
        };
        self.transcript.append(Role::User, content);

        let mut history = self.message_history(true);
        let (memories, recalled) = self.memory.recall_memories(&history, now);
        let bundle = self.thought.think(
            &self.message_history(false),
            &memories,
            &recalled,
            self.last_message_time,
            now,
        );
        self.emotion.experience(&bundle.emotion_object);

        let user_content = self
            .transcript
            .last()
            .map(|m| m.content.clone())
            .ok_or(AgentError::EmptyBuffer)?;
        let (mut user_text, image) = user_content.split_image();
        if image.is_some() {
            user_text.push_str(IMAGE_ATTACHED_MARKER);
        }

        let beliefs = self.memory.beliefs();
        let prompt = render_user_prompt(&PromptContext {
            name: &self.config.name,
            personality_summary: self.personality.summary(),
            user_input: &user_text,
            thoughts: &bundle.thoughts,
            emotion: &bundle.emotion,
            emotion_reason: &bundle.emotion_reason,
            memories: &memories,
            user_emotions: &bundle.possible_user_emotions,
            beliefs: &beliefs,
            mood_long_desc: self.emotion.mood_long_description(),
            mood_prompt: self.emotion.mood_prompt(),
            last_message_time: self.last_message_time,
            now,
        });

        let outbound = match &image {
            Some(url) => Content::Parts(vec![
                ContentPart::ImageUrl {
                    image_url: url.clone(),
                },
                ContentPart::Text { text: prompt },
            ]),
            None => Content::Text(prompt),
        };
        if let Some(last) = history.last_mut() {
            last.content = outbound;
        }

        let response = backends
            .chat
            .generate(&history, &turn_sampling(request.structured))
            .await?;

        let memory_text = self
            .input_to_memory(
                backends.vision.as_ref(),
                &request.text,
                image.as_deref(),
                &response,
            )
            .await?;
        self.memory
            .remember(&memory_text, &bundle.emotion_object, now);

        let done = Utc::now();
        self.last_message_time = Some(done);
        self.turn_count += 1;
        self.tick(done);

        self.transcript
            .append(Role::Assistant, response.to_transcript_text());
        tracing::info!(
            "Turn {} committed (emotion: {}, memories recalled: {})",
            self.turn_count,
            bundle.emotion,
            recalled.len()
        );

        let thoughts = self.thought.show_thoughts().then_some(bundle.thoughts);
        Ok(TurnReply { response, thoughts })
    }

    async fn input_to_memory(
        &self,
        vision: &dyn LlmClient,
        user_input: &str,
        image_url: Option<&str>,
        response: &Generation,
    ) -> Result<String, AgentError> {
        let mut user_msg = String::new();
        if let Some(url) = image_url {
            let description = describe_image(vision, url).await?;
            user_msg.push_str(&format!(
                "<attached_img url=\"{url}\">Description: {description}</attached_img>\n"
            ));
        }
        user_msg.push_str(user_input);
        Ok(format!(
            "User: {user_msg}\n\n{}: {}",
            self.config.name,
            response.to_transcript_text()
        ))
    }
}

/// 一次性图片描述请求（低温度）
pub async fn describe_image(client: &dyn LlmClient, image_url: &str) -> Result<String, AgentError> {
    let message = Message::user(Content::Parts(vec![
        ContentPart::ImageUrl {
            image_url: image_url.to_string(),
        },
        ContentPart::Text {
            text: DESCRIBE_IMAGE_PROMPT.to_string(),
        },
    ]));
    let options = SamplingOptions {
        temperature: 0.1,
        max_tokens: 1024,
        ..SamplingOptions::default()
    };
    let description = client.generate(&[message], &options).await?;
    Ok(description.to_transcript_text())
}

fn render_suggest_prompt(name: &str, conversation: &[Message], now: DateTime<Utc>) -> String {
    let history = conversation
        .iter()
        .filter_map(|m| match m.role {
            Role::User => Some(format!("HUMAN: {}", m.content.text())),
            Role::Assistant => Some(format!("AI: {}", m.content.text())),
            Role::System => None,
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    let history = if history.is_empty() {
        "No conversation yet; generate suggested greetings/starters for the human.".to_string()
    } else {
        history
    };
    let local = now.with_timezone(&Local);
    fill_template(SUGGEST_TEMPLATE, |key| match key {
        "name" => Some(name.to_string()),
        "date" => Some(local.format("%a, %-m/%-d/%Y").to_string()),
        "time" => Some(local.format("%-I:%M %p").to_string()),
        "conversation_history" => Some(history.clone()),
        _ => None,
    })
}

/// 让模型为用户建议 3~5 条可能的回复
pub async fn suggest_responses(
    client: &dyn LlmClient,
    name: &str,
    conversation: &[Message],
) -> Result<Vec<String>, AgentError> {
    let prompt = render_suggest_prompt(name, conversation, Utc::now());
    let options = SamplingOptions {
        temperature: 1.0,
        presence_penalty: 1.5,
        json: true,
        ..SamplingOptions::default()
    };
    let generation = client.generate_prompt(&prompt, &options).await?;
    let suggestions = generation
        .as_json()
        .and_then(|v| v.get("possible_responses"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            LlmError::InvalidJson("missing \"possible_responses\" array".to_string())
        })?
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    Ok(suggestions)
}
