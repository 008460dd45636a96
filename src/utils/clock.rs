//! 时钟抽象
//!
//! 调度器只通过 `Clock` 获取当前时间和等待，测试中可以用手动时钟
//! 瞬间跑完多个周期

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use std::time::Duration;

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    async fn sleep(&self, duration: Duration);
}

/// 真实时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// `now` 所在自然日的零点（本地时区），换算为 UTC，用于"今日处理数"统计
pub fn local_midnight_utc(now: DateTime<Local>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .unwrap_or(now)
        .with_timezone(&Utc)
}
