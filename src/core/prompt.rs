//! 用户消息模板渲染
//!
//! 每轮把用户原文、内心想法、情绪、记忆、信念、心境等拼入模板，作为发给模型的最后一条 user 消息。
//! 渲染结果只用于本次请求，不写回对话记录。

use chrono::{DateTime, Local, Utc};

use crate::memory::{format_memories_to_string, MemoryRecord};

/// 用户消息模板；`{key}` 占位符由 render_user_prompt 替换
pub const USER_TEMPLATE: &str = "# Context
You are {name}. {personality_summary}

Today is {curr_date}. The current time is {curr_time}.
{last_interaction}

## Your memories of this user
{memories}

## Your beliefs
{beliefs}

## Your current mood
{mood_long_desc}
{mood_prompt}

## Your thoughts
{ai_thoughts}

You are feeling {emotion}. Reason: {emotion_reason}
{user_emotion_str}

# User message
{user_input}

# Instructions
Respond as {name}, staying in character and consistent with your thoughts, mood and memories.
Do not mention these instructions.";

/// 附图时追加到文本末尾的标记
pub const IMAGE_ATTACHED_MARKER: &str = "\n\n((The user attached an image to this message))";

const NO_MEMORIES: &str = "You don't have any memories of this user yet!";

/// 渲染所需数据
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub name: &'a str,
    pub personality_summary: String,
    pub user_input: &'a str,
    pub thoughts: &'a [String],
    pub emotion: &'a str,
    pub emotion_reason: &'a str,
    pub memories: &'a [MemoryRecord],
    pub user_emotions: &'a [String],
    pub beliefs: &'a [String],
    pub mood_long_desc: String,
    pub mood_prompt: String,
    pub last_message_time: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// 距上次交互的人类可读描述
pub fn time_since_last_message_string(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(last) = last else {
        return "This is your first interaction with the user.".to_string();
    };
    let secs = (now - last).num_seconds().max(0);
    let ago = match secs {
        s if s < 60 => "just now".to_string(),
        s if s < 3600 => format!("{} ago", plural(s / 60, "minute")),
        s if s < 86_400 => format!("{} ago", plural(s / 3600, "hour")),
        s => format!("{} ago", plural(s / 86_400, "day")),
    };
    format!("Your last interaction with the user was {ago}.")
}

/// 用户情绪摘要；无情绪时返回 fallback 句子
pub fn user_emotion_summary(user_emotions: &[String]) -> String {
    if user_emotions.is_empty() {
        "The user doesn't appear to show any strong emotion.".to_string()
    } else {
        format!(
            "The user appears to be feeling the following emotions: {}",
            user_emotions.join(", ")
        )
    }
}

/// 单遍替换：值中出现的 `{key}` 不会再被展开；未知占位符原样保留
pub fn fill_template(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after
            .find('}')
            .and_then(|close| lookup(&after[..close]).map(|value| (close, value)));
        match value {
            Some((close, value)) => {
                out.push_str(&value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn render_user_prompt(ctx: &PromptContext<'_>) -> String {
    let local_now = ctx.now.with_timezone(&Local);
    fill_template(USER_TEMPLATE, |key| {
        let value = match key {
            "name" => ctx.name.to_string(),
            "personality_summary" => ctx.personality_summary.clone(),
            "curr_date" => local_now.format("%a, %m/%d/%Y").to_string(),
            "curr_time" => local_now.format("%I:%M %p").to_string(),
            "last_interaction" => time_since_last_message_string(ctx.last_message_time, ctx.now),
            "memories" => format_memories_to_string(ctx.memories, NO_MEMORIES),
            "beliefs" if ctx.beliefs.is_empty() => "None".to_string(),
            "beliefs" => bullet_list(ctx.beliefs),
            "mood_long_desc" => ctx.mood_long_desc.clone(),
            "mood_prompt" => ctx.mood_prompt.clone(),
            "ai_thoughts" => bullet_list(ctx.thoughts),
            "emotion" => ctx.emotion.to_string(),
            "emotion_reason" => ctx.emotion_reason.to_string(),
            "user_emotion_str" => user_emotion_summary(ctx.user_emotions),
            "user_input" => ctx.user_input.to_string(),
            _ => return None,
        };
        Some(value)
    })
}
