//! 外部协作方的能力接口 - 业务能力层
//!
//! 编排层只依赖这三个 trait，具体实现（HTTP 平台、各家 LLM）在启动时注入。
//! 所有调用都不在内部重试，失败的订单由下一个周期重新发现后再处理。

use async_trait::async_trait;

use crate::error::{CompositionError, DiscoveryError, SubmissionError};
use crate::models::{OrderCandidate, OrderPage, TimeWindow};

/// 订单来源：按时间窗口分页拉取存在退款纠纷的订单
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// `page_token` 为 `None` 时取第一页；返回的 `next_page_token` 为空表示取完
    async fn fetch_page(
        &self,
        window: &TimeWindow,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<OrderPage, DiscoveryError>;
}

/// 申诉文本生成
#[async_trait]
pub trait Composer: Send + Sync {
    /// 服务商名称，仅用于日志
    fn provider(&self) -> &str;

    async fn compose(&self, order: &OrderCandidate) -> Result<String, CompositionError>;
}

/// 申诉提交
#[async_trait]
pub trait AppealSubmitter: Send + Sync {
    async fn submit(&self, order_id: &str, text: &str) -> Result<(), SubmissionError>;
}
