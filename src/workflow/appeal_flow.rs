//! 单个订单的申诉流程 - 流程层
//!
//! 流程顺序：
//! 1. 查台账：已 `succeeded` 直接跳过
//! 2. 生成申诉文本
//! 3. 提交申诉
//! 4. 写台账（成功 / 失败都写，失败的订单下个周期会重试）
//!
//! 生成或提交失败只影响当前订单；台账读写失败则向上返回，由编排层终止周期。

use chrono::Utc;
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{error, info, warn};

use crate::error::LedgerError;
use crate::models::{OrderCandidate, OrderError};
use crate::services::{AppealSubmitter, Composer, ContestationJournal};
use crate::storage::{Ledger, LedgerStatus, PutOutcome};
use crate::utils::logging::truncate_text;

/// 单个订单的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppealOutcome {
    /// 申诉已提交，台账记为 `succeeded`
    Sent,
    /// 台账中已成功，未调用任何外部服务
    Skipped,
    /// 生成或提交失败，台账记为 `failed`
    Failed(OrderError),
}

/// 单个订单的申诉流程
///
/// - 不持有订单列表，只处理一个订单
/// - 不做重试
pub struct AppealFlow {
    ledger: Arc<dyn Ledger>,
    composer: Arc<dyn Composer>,
    submitter: Arc<dyn AppealSubmitter>,
    journal: Option<Arc<ContestationJournal>>,
}

impl AppealFlow {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        composer: Arc<dyn Composer>,
        submitter: Arc<dyn AppealSubmitter>,
    ) -> Self {
        Self {
            ledger,
            composer,
            submitter,
            journal: None,
        }
    }

    /// 提交成功的申诉全文同时写入申诉日志
    pub fn with_journal(mut self, journal: Arc<ContestationJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub async fn run(&self, order: &OrderCandidate) -> Result<AppealOutcome, LedgerError> {
        let order_id = order.order_id.as_str();

        if let Some(record) = self.ledger.get(order_id)? {
            if record.is_succeeded() {
                info!("[订单 {}] ⏭️  已申诉过，跳过", order_id);
                return Ok(AppealOutcome::Skipped);
            }
            info!(
                "[订单 {}] 🔁 上次失败 ({})，重新申诉",
                order_id,
                record.error_detail.as_deref().unwrap_or("未知原因")
            );
        }

        info!(
            "[订单 {}] 🧠 正在生成申诉 ({}), 原因: {}",
            order_id,
            self.composer.provider(),
            truncate_text(&order.dispute.reason, 60)
        );
        let text = match self.composer.compose(order).await {
            Ok(text) => text,
            Err(e) => return self.record_failure(order_id, e.to_string()),
        };

        info!("[订单 {}] 📤 正在提交申诉...", order_id);
        if let Err(e) = self.submitter.submit(order_id, &text).await {
            return self.record_failure(order_id, e.to_string());
        }

        let outcome = blocking(|| {
            self.ledger
                .put(order_id, LedgerStatus::Succeeded, Utc::now(), None)
        })
        .map_err(|e| {
            error!(
                "[订单 {}] ❌ 申诉已提交但台账写入失败，下个周期可能重复申诉: {}",
                order_id, e
            );
            e
        })?;
        if outcome == PutOutcome::AlreadySucceeded {
            warn!("[订单 {}] 台账中已存在成功记录", order_id);
        }

        info!("[订单 {}] ✓ 申诉提交成功", order_id);

        if let Some(journal) = &self.journal {
            if let Err(e) = journal.record_contestation(order_id, &text).await {
                warn!("[订单 {}] ⚠️ 申诉日志写入失败: {}", order_id, e);
            }
        }

        Ok(AppealOutcome::Sent)
    }

    fn record_failure(
        &self,
        order_id: &str,
        reason: String,
    ) -> Result<AppealOutcome, LedgerError> {
        warn!("[订单 {}] ⚠️ {}", order_id, reason);

        blocking(|| {
            self.ledger
                .put(order_id, LedgerStatus::Failed, Utc::now(), Some(&reason))
        })
        .map_err(|e| {
            error!("[订单 {}] ❌ 失败记录写入台账失败: {}", order_id, e);
            e
        })?;

        Ok(AppealOutcome::Failed(OrderError::for_order(order_id, reason)))
    }
}

/// 台账写入会 fsync；多线程运行时下让出当前工作线程，单线程运行时直接执行
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}
