//! Mistral API 客户端（OpenAI 兼容格式）
//!
//! - Base URL: https://api.mistral.ai/v1
//! - 模型: mistral-medium-latest（对话与图片理解）

use crate::llm::OpenAiClient;

pub const MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";
pub const MISTRAL_MEDIUM: &str = "mistral-medium-latest";

/// 创建 Mistral 客户端
///
/// - 使用环境变量 `MISTRAL_API_KEY`
/// - 模型可通过 `model` 参数或 `MISTRAL_MODEL` 环境变量指定，默认 `mistral-medium-latest`
pub fn create_mistral_client(model: Option<&str>) -> OpenAiClient {
    let api_key = std::env::var("MISTRAL_API_KEY").unwrap_or_else(|_| "sk-placeholder".to_string());

    let model = model
        .map(String::from)
        .or_else(|| std::env::var("MISTRAL_MODEL").ok())
        .unwrap_or_else(|| MISTRAL_MEDIUM.to_string());

    OpenAiClient::new(Some(MISTRAL_BASE_URL), &model, Some(api_key.as_str()))
}
