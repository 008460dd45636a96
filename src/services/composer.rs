//! 申诉文本生成服务 - 业务能力层
//!
//! 每家服务商一个 `Composer` 实现，启动时按配置选定一次，注入编排层。
//! 每次生成都受 `compose_timeout` 限制，超时、接口报错、空输出都归为 `CompositionError`。

use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use crate::clients::{GeminiClient, LlmClient};
use crate::config::{Config, LlmProvider};
use crate::error::CompositionError;
use crate::models::OrderCandidate;
use crate::services::prompt::{self, SYSTEM_MESSAGE};
use crate::services::Composer;

/// 按配置选择服务商
pub fn build_composer(config: &Config) -> Result<Box<dyn Composer>> {
    let composer: Box<dyn Composer> = match config.llm_provider {
        LlmProvider::OpenAi => Box::new(OpenAiComposer::new(config)),
        LlmProvider::Gemini => Box::new(GeminiComposer::new(config)?),
    };

    info!(
        "🧠 申诉生成服务: {} ({})",
        composer.provider(),
        config.llm_model_name
    );

    Ok(composer)
}

/// OpenAI 兼容服务
pub struct OpenAiComposer {
    client: LlmClient,
    timeout: Duration,
}

impl OpenAiComposer {
    pub fn new(config: &Config) -> Self {
        Self {
            client: LlmClient::new(config),
            timeout: config.compose_timeout(),
        }
    }
}

#[async_trait]
impl Composer for OpenAiComposer {
    fn provider(&self) -> &str {
        "openai"
    }

    async fn compose(&self, order: &OrderCandidate) -> Result<String, CompositionError> {
        debug!("订单 {} 使用模型 {} 生成申诉", order.order_id, self.client.model_name());
        let user_message = prompt::build_user_message(order);
        let raw = with_timeout(
            self.timeout,
            self.client.chat(&user_message, Some(SYSTEM_MESSAGE)),
        )
        .await?;
        prompt::finish_contestation(&raw)
    }
}

/// Google Gemini
pub struct GeminiComposer {
    client: GeminiClient,
    timeout: Duration,
}

impl GeminiComposer {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: GeminiClient::new(config)?,
            timeout: config.compose_timeout(),
        })
    }
}

#[async_trait]
impl Composer for GeminiComposer {
    fn provider(&self) -> &str {
        "gemini"
    }

    async fn compose(&self, order: &OrderCandidate) -> Result<String, CompositionError> {
        debug!("订单 {} 使用模型 {} 生成申诉", order.order_id, self.client.model_name());
        let user_message = prompt::build_user_message(order);
        let raw = with_timeout(
            self.timeout,
            self.client.chat(&user_message, Some(SYSTEM_MESSAGE)),
        )
        .await?;
        prompt::finish_contestation(&raw)
    }
}

/// 给一次模型调用加上超时，并统一转换为 `CompositionError`
async fn with_timeout<F>(timeout: Duration, call: F) -> Result<String, CompositionError>
where
    F: Future<Output = Result<String>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(CompositionError::new(format!("{:#}", e))),
        Err(_) => Err(CompositionError::new(format!(
            "模型调用超时 ({} 秒)",
            timeout.as_secs()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_composition_error() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Ok::<_, anyhow::Error>("tarde demais".to_string())
        };

        let err = with_timeout(Duration::from_secs(60), slow).await.unwrap_err();
        assert!(err.reason.contains("超时"));
        assert!(err.reason.contains("60"));
    }

    #[tokio::test]
    async fn test_provider_error_keeps_context() {
        let failing = async { Err::<String, _>(anyhow::anyhow!("LLM API 调用失败: 429")) };

        let err = with_timeout(Duration::from_secs(5), failing).await.unwrap_err();
        assert_eq!(err.reason, "LLM API 调用失败: 429");
    }

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let text = with_timeout(Duration::from_secs(5), async { Ok::<_, anyhow::Error>("ok".to_string()) })
            .await
            .unwrap();
        assert_eq!(text, "ok");
    }

    #[test]
    fn test_build_composer_selects_provider() {
        let config = Config {
            llm_provider: LlmProvider::Gemini,
            ..Config::default()
        };
        assert_eq!(build_composer(&config).unwrap().provider(), "gemini");

        let config = Config::default();
        assert_eq!(build_composer(&config).unwrap().provider(), "openai");
    }
}
