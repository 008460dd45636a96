//! 周期相关的数据结构
//!
//! - `TimeWindow`：一次周期查询的日期区间（按自然日）
//! - `CycleResult`：一次周期的统计结果，只用于日志汇总，不持久化

use chrono::{Duration, NaiveDate};
use std::fmt::{self, Display};

/// 查询时间窗口，闭区间，粒度为自然日
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl TimeWindow {
    /// 创建时间窗口，`start > end` 时返回 `None`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// 以 `today` 为终点，向前回溯 `days` 天
    ///
    /// 超出日期范围时起点取 `NaiveDate::MIN`
    pub fn looking_back(today: NaiveDate, days: u32) -> Self {
        Self {
            start: today
                .checked_sub_signed(Duration::days(i64::from(days)))
                .unwrap_or(NaiveDate::MIN),
            end: today,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// 平台接口使用的日期格式 `YYYY-MM-DD`
    pub fn start_param(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

impl Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} 至 {}", self.start_param(), self.end_param())
    }
}

/// 周期内的一条错误记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderError {
    /// 订单号；拉取订单失败时为空
    pub order_id: Option<String>,
    pub reason: String,
}

impl OrderError {
    pub fn for_order(order_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            order_id: Some(order_id.into()),
            reason: reason.into(),
        }
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self {
            order_id: None,
            reason: reason.into(),
        }
    }
}

impl Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.order_id {
            Some(order_id) => write!(f, "[订单 {}] {}", order_id, self.reason),
            None => write!(f, "[订单拉取] {}", self.reason),
        }
    }
}

/// 单个周期的处理结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleResult {
    /// 本周期拉取到的全部订单号（无论是否处理）
    pub found_order_ids: Vec<String>,
    /// 成功提交的申诉数
    pub appeals_sent: usize,
    /// 台账中已成功、直接跳过的订单数
    pub appeals_skipped: usize,
    pub errors: Vec<OrderError>,
}

impl CycleResult {
    pub fn found(&self) -> usize {
        self.found_order_ids.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
