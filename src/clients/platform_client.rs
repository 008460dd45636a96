//! 订单平台 API 客户端
//!
//! 同一个 `reqwest::Client` 同时提供订单查询（`OrderSource`）和申诉提交（`AppealSubmitter`）
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::{DiscoveryError, SubmissionError};
use crate::models::{OrderPage, TimeWindow};
use crate::services::{AppealSubmitter, OrderSource};
use crate::utils::logging::truncate_text;

/// 只查询买家已发起退款、尚待处理的订单
const REFUND_REQUESTED_STATUS: &str = "refund_requested";

/// 平台 API 客户端
pub struct PlatformClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Serialize)]
struct AppealRequest<'a> {
    text: &'a str,
}

/// 申诉接口的响应体，部分错误以 200 + `success: false` 的形式返回
#[derive(Debug, Default, Deserialize)]
struct AppealResponse {
    success: Option<bool>,
    message: Option<String>,
}

impl PlatformClient {
    /// 创建新的平台客户端
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("无法创建平台 HTTP 客户端")?;

        Ok(Self {
            http,
            base_url: config.platform_api_base_url.trim_end_matches('/').to_string(),
            token: config.platform_api_token.clone(),
        })
    }

    fn orders_endpoint(&self) -> String {
        format!("{}/orders", self.base_url)
    }

    fn appeal_endpoint(&self, order_id: &str) -> String {
        format!("{}/orders/{}/refund-appeal", self.base_url, order_id)
    }
}

/// 构建订单查询参数
fn order_query(
    window: &TimeWindow,
    page_token: Option<&str>,
    page_size: u32,
) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("start_date", window.start_param()),
        ("end_date", window.end_param()),
        ("page_size", page_size.to_string()),
        ("status", REFUND_REQUESTED_STATUS.to_string()),
    ];
    if let Some(token) = page_token {
        query.push(("page_token", token.to_string()));
    }
    query
}

/// 解释申诉接口的响应
fn interpret_appeal_response(status: StatusCode, body: &str) -> Result<(), SubmissionError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SubmissionError::new(format!(
            "平台鉴权失败 ({})",
            status.as_u16()
        )));
    }

    if !status.is_success() {
        return Err(SubmissionError::new(format!(
            "平台拒绝申诉 ({}): {}",
            status.as_u16(),
            truncate_text(body.trim(), 200)
        )));
    }

    // 非 JSON 的 2xx 响应按成功处理
    let response: AppealResponse = serde_json::from_str(body).unwrap_or_default();
    if response.success == Some(false) {
        return Err(SubmissionError::new(format!(
            "平台拒绝申诉: {}",
            response.message.as_deref().unwrap_or("未返回原因")
        )));
    }

    Ok(())
}

#[async_trait]
impl OrderSource for PlatformClient {
    async fn fetch_page(
        &self,
        window: &TimeWindow,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<OrderPage, DiscoveryError> {
        let endpoint = self.orders_endpoint();
        debug!("拉取订单: {} token={:?}", window, page_token);

        let response = self
            .http
            .get(&endpoint)
            .bearer_auth(&self.token)
            .query(&order_query(window, page_token, page_size))
            .send()
            .await
            .map_err(|e| DiscoveryError::RequestFailed {
                endpoint: endpoint.clone(),
                source: Box::new(e),
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DiscoveryError::Unauthorized {
                endpoint,
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DiscoveryError::BadResponse {
                endpoint,
                status: status.as_u16(),
                message: truncate_text(body.trim(), 200),
            });
        }

        response
            .json::<OrderPage>()
            .await
            .map_err(|e| DiscoveryError::Decode(e.to_string()))
    }
}

#[async_trait]
impl AppealSubmitter for PlatformClient {
    async fn submit(&self, order_id: &str, text: &str) -> Result<(), SubmissionError> {
        let endpoint = self.appeal_endpoint(order_id);
        debug!("提交申诉: {} ({} 字符)", endpoint, text.chars().count());

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.token)
            .json(&AppealRequest { text })
            .send()
            .await
            .map_err(|e| SubmissionError::new(format!("网络请求失败: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        interpret_appeal_response(status, &body)
    }
}
