//! 订单台账契约
//!
//! 每个订单号最多一条终态记录：
//! - `succeeded` 是终态，之后的写入一律忽略
//! - `failed` 允许在后续周期被新一次尝试的结果覆盖

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::error::LedgerError;

/// 订单处理结果，只持久化终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    Succeeded,
    Failed,
}

impl Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerStatus::Succeeded => write!(f, "succeeded"),
            LedgerStatus::Failed => write!(f, "failed"),
        }
    }
}

/// 台账记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub status: LedgerStatus,
    /// 最近一次尝试的时间
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl LedgerRecord {
    pub fn is_succeeded(&self) -> bool {
        self.status == LedgerStatus::Succeeded
    }
}

/// `put` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// 已写入并落盘
    Written,
    /// 原记录已是 `succeeded`，未做任何修改
    AlreadySucceeded,
}

/// 台账汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub last_timestamp: Option<DateTime<Utc>>,
}

impl LedgerStats {
    /// 扫描全部记录得出汇总
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a LedgerRecord>) -> Self {
        records
            .into_iter()
            .fold(LedgerStats::default(), |mut stats, record| {
                stats.total += 1;
                match record.status {
                    LedgerStatus::Succeeded => stats.succeeded += 1,
                    LedgerStatus::Failed => stats.failed += 1,
                }
                stats.last_timestamp = stats.last_timestamp.max(Some(record.timestamp));
                stats
            })
    }
}

/// 订单台账
///
/// 实现方必须保证 `put` 返回之前记录已经持久化。
/// 方法都是同步阻塞调用（文件实现会 fsync），异步调用方需要自行避免阻塞运行时
pub trait Ledger: Send + Sync {
    fn get(&self, order_id: &str) -> Result<Option<LedgerRecord>, LedgerError>;

    /// 写入终态记录；原记录为 `succeeded` 时不做修改
    fn put(
        &self,
        order_id: &str,
        status: LedgerStatus,
        timestamp: DateTime<Utc>,
        error_detail: Option<&str>,
    ) -> Result<PutOutcome, LedgerError>;

    fn count_all(&self) -> Result<LedgerStats, LedgerError>;

    /// `cutoff` 之后（含）有过尝试的订单数
    fn count_since(&self, cutoff: DateTime<Utc>) -> Result<usize, LedgerError>;
}
