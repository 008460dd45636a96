//! 申诉日志写入服务 - 业务能力层
//!
//! 把提交过的申诉全文和每个周期的汇总追加写入按日期分割的文本文件，
//! 方便人工复核。写入失败只记警告，不影响台账和周期结果。

use anyhow::Result;
use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::models::{CycleResult, TimeWindow};

/// 申诉日志
pub struct ContestationJournal {
    dir: PathBuf,
}

impl ContestationJournal {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 记录一条已提交的申诉
    pub async fn record_contestation(&self, order_id: &str, text: &str) -> Result<()> {
        let now = Local::now();
        let entry = format!(
            "{}\n订单: {}\n时间: {}\n{}\n{}\n\n",
            "=".repeat(60),
            order_id,
            now.format("%Y-%m-%d %H:%M:%S"),
            "-".repeat(60),
            text
        );
        self.append("contestations", &entry).await
    }

    /// 记录周期汇总
    pub async fn record_cycle(
        &self,
        cycle_number: u64,
        window: &TimeWindow,
        result: &CycleResult,
    ) -> Result<()> {
        let now = Local::now();
        let mut entry = format!(
            "[{}] 周期 #{} | 区间 {} | 拉取 {} | 提交 {} | 跳过 {} | 错误 {}\n",
            now.format("%Y-%m-%d %H:%M:%S"),
            cycle_number,
            window,
            result.found(),
            result.appeals_sent,
            result.appeals_skipped,
            result.errors.len()
        );
        for err in &result.errors {
            entry.push_str(&format!("    - {}\n", err));
        }
        self.append("cycles", &entry).await
    }

    async fn append(&self, prefix: &str, entry: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let path = self
            .dir
            .join(format!("{}_{}.txt", prefix, Local::now().format("%Y-%m-%d")));
        debug!("写入日志: {}", path.display());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}
