//! 周期编排器 - 编排层
//!
//! ## 职责
//!
//! 一次完整的周期：
//! 1. 按时间窗口分页拉取候选订单，直到空页或没有下一页标记
//! 2. 逐个订单交给 `AppealFlow`（查台账 → 生成 → 提交 → 写台账）
//! 3. 汇总 `CycleResult`
//!
//! ## 失败隔离
//!
//! - 单个订单的生成/提交失败只记入错误列表，继续处理下一个订单
//! - 分页中途失败：已拉到的订单照常处理完，再以 `CycleError::Discovery` 返回
//! - 台账读写失败：立即终止周期，返回 `CycleError::Ledger`
//!
//! 相邻周期的时间窗口有意重叠，靠台账中的 `succeeded` 记录保证同一订单只申诉一次。

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{CycleError, DiscoveryError};
use crate::models::{CycleResult, OrderCandidate, OrderError, TimeWindow};
use crate::services::OrderSource;
use crate::workflow::{AppealFlow, AppealOutcome};

/// 周期编排器
pub struct CycleRunner {
    source: Arc<dyn OrderSource>,
    flow: AppealFlow,
}

/// 分页拉取的结果：拉到的订单，以及中途的失败（如果有）
struct Discovery {
    candidates: Vec<OrderCandidate>,
    failure: Option<DiscoveryError>,
}

impl CycleRunner {
    pub fn new(source: Arc<dyn OrderSource>, flow: AppealFlow) -> Self {
        Self { source, flow }
    }

    /// 执行一个周期
    ///
    /// 即使所有订单都失败也返回 `Ok`；只有拉取失败或台账失败才返回 `Err`，
    /// 且 `Err` 中带有失败前已累积的结果
    pub async fn run_cycle(
        &self,
        window: &TimeWindow,
        page_size: u32,
    ) -> Result<CycleResult, CycleError> {
        let mut result = CycleResult::default();

        let Discovery {
            candidates,
            failure,
        } = self.discover(window, page_size).await;

        result.found_order_ids = candidates.iter().map(|o| o.order_id.clone()).collect();
        info!("📋 本周期共拉取 {} 个订单", candidates.len());

        if let Some(e) = &failure {
            error!("❌ 订单拉取中断: {}", e);
            result.errors.push(OrderError::transport(e.to_string()));
        }

        for (idx, order) in candidates.iter().enumerate() {
            info!(
                "[{}/{}] 处理订单 {}",
                idx + 1,
                candidates.len(),
                order.order_id
            );

            match self.flow.run(order).await {
                Ok(AppealOutcome::Sent) => result.appeals_sent += 1,
                Ok(AppealOutcome::Skipped) => result.appeals_skipped += 1,
                Ok(AppealOutcome::Failed(err)) => result.errors.push(err),
                Err(source) => {
                    error!(
                        ledger_write_failed = true,
                        "❌ 台账不可用，终止本周期 (订单 {}): {}", order.order_id, source
                    );
                    return Err(CycleError::Ledger {
                        order_id: order.order_id.clone(),
                        source,
                        partial: result,
                    });
                }
            }
        }

        match failure {
            Some(source) => Err(CycleError::Discovery {
                source,
                partial: result,
            }),
            None => Ok(result),
        }
    }

    /// 分页拉取全部候选订单
    ///
    /// 同一订单在多页中重复出现时只保留第一次，保证一个周期内每个订单最多处理一次。
    /// 平台返回任何已经用过的分页标记时停止翻页
    async fn discover(&self, window: &TimeWindow, page_size: u32) -> Discovery {
        let mut candidates = Vec::new();
        let mut seen = HashSet::new();
        let mut tokens_used = HashSet::new();
        let mut page_token: Option<String> = None;
        let mut page_number = 0usize;

        loop {
            page_number += 1;
            let page = match self
                .source
                .fetch_page(window, page_token.as_deref(), page_size)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    return Discovery {
                        candidates,
                        failure: Some(e),
                    }
                }
            };

            info!("📄 第 {} 页: {} 个订单", page_number, page.orders.len());

            let page_was_empty = page.orders.is_empty();
            for order in page.orders {
                if seen.insert(order.order_id.clone()) {
                    candidates.push(order);
                }
            }

            match page.next_page_token {
                Some(next) if !page_was_empty => {
                    if !tokens_used.insert(next.clone()) {
                        warn!("⚠️ 平台返回了已使用过的分页标记 {}，停止翻页", next);
                        break;
                    }
                    page_token = Some(next);
                }
                _ => break,
            }
        }

        Discovery {
            candidates,
            failure: None,
        }
    }
}
