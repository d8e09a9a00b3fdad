//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mistral / Mock）

pub mod mistral;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;

pub use mistral::{create_mistral_client, MISTRAL_BASE_URL, MISTRAL_MEDIUM};
pub use mock::{MockLlmClient, RecordedRequest};
pub use openai::OpenAiClient;
pub use traits::{parse_generation, Generation, LlmClient, LlmError, SamplingOptions};

/// 对话后端与图片描述后端
#[derive(Clone)]
pub struct Backends {
    pub chat: Arc<dyn LlmClient>,
    pub vision: Arc<dyn LlmClient>,
}

impl Backends {
    /// 两者共用同一个客户端
    pub fn single(client: Arc<dyn LlmClient>) -> Self {
        Self {
            chat: client.clone(),
            vision: client,
        }
    }
}

/// 根据配置与环境变量选择 LLM 后端（Mistral / OpenAI 兼容 / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Backends {
    let provider = cfg.llm.provider.to_lowercase();
    let use_mistral = provider == "mistral" && std::env::var("MISTRAL_API_KEY").is_ok();
    let use_openai = provider == "openai" && std::env::var("OPENAI_API_KEY").is_ok();

    if use_mistral {
        let model = cfg.llm.model.clone();
        let vision = cfg
            .llm
            .vision_model
            .clone()
            .unwrap_or_else(|| MISTRAL_MEDIUM.to_string());
        tracing::info!(
            "Using Mistral LLM ({})",
            model.as_deref().unwrap_or(MISTRAL_MEDIUM)
        );
        Backends {
            chat: Arc::new(create_mistral_client(model.as_deref())),
            vision: Arc::new(create_mistral_client(Some(&vision))),
        }
    } else if use_openai {
        let model = cfg
            .llm
            .model
            .clone()
            .unwrap_or_else(|| "gpt-4o-mini".to_string());
        let vision = cfg.llm.vision_model.clone().unwrap_or_else(|| model.clone());
        let base = cfg.llm.base_url.as_deref();
        let key = std::env::var("OPENAI_API_KEY").ok();
        tracing::info!("Using OpenAI LLM ({})", model);
        Backends {
            chat: Arc::new(OpenAiClient::new(base, &model, key.as_deref())),
            vision: Arc::new(OpenAiClient::new(base, &vision, key.as_deref())),
        }
    } else {
        tracing::warn!("No API key set or provider unknown, using Mock LLM");
        Backends::single(Arc::new(MockLlmClient::new()))
    }
}
