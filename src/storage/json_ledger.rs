//! 基于 JSON 文件的台账实现
//!
//! 文件内容是 `{ "<订单号>": { "status", "timestamp", "error_detail"? } }`。
//! 每次 `put` 都先写临时文件并 `sync_all`，再原子地 rename 覆盖目标文件，
//! 最后对所在目录 `sync_all` 固化目录项，所以 `put` 返回后即使崩溃或断电记录也不会丢失。

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::LedgerError;
use crate::storage::ledger::{Ledger, LedgerRecord, LedgerStats, LedgerStatus, PutOutcome};

/// JSON 文件台账
pub struct JsonFileLedger {
    path: PathBuf,
    records: Mutex<HashMap<String, LedgerRecord>>,
}

impl JsonFileLedger {
    /// 打开台账文件，文件不存在时视为空台账
    ///
    /// 文件存在但无法解析时返回错误，不会丢弃已有内容
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let records = Self::load(&path)?;

        info!(
            "💾 台账已加载: {} ({} 条记录)",
            path.display(),
            records.len()
        );

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<HashMap<String, LedgerRecord>, LedgerError> {
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).map_err(|source| LedgerError::Io {
            path: path.display().to_string(),
            source,
        })?;

        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&content).map_err(|source| LedgerError::Corrupt {
            path: path.display().to_string(),
            source,
        })
    }

    /// 把整张台账写入磁盘：临时文件 → fsync → rename → 目录 fsync
    fn persist(&self, records: &HashMap<String, LedgerRecord>) -> Result<(), LedgerError> {
        let io_err = |source: std::io::Error| LedgerError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let bytes = serde_json::to_vec_pretty(records)?;
        let tmp_path = self.path.with_extension("json.tmp");

        let mut file = File::create(&tmp_path).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(io_err)?;
        sync_parent_dir(&self.path).map_err(io_err)?;

        debug!("台账已落盘: {} 条记录", records.len());
        Ok(())
    }
}

/// rename 之后同步所在目录，否则断电时目录项可能仍停留在页缓存中
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    File::open(dir)?.sync_all()
}

// Windows 上无法以文件句柄打开目录，rename 本身由 NTFS 日志保证
#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl Ledger for JsonFileLedger {
    fn get(&self, order_id: &str) -> Result<Option<LedgerRecord>, LedgerError> {
        let records = self.records.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(records.get(order_id).cloned())
    }

    fn put(
        &self,
        order_id: &str,
        status: LedgerStatus,
        timestamp: DateTime<Utc>,
        error_detail: Option<&str>,
    ) -> Result<PutOutcome, LedgerError> {
        let mut records = self.records.lock().map_err(|_| LedgerError::Poisoned)?;

        if records.get(order_id).is_some_and(LedgerRecord::is_succeeded) {
            warn!("订单 {} 已成功申诉，忽略新的 {} 记录", order_id, status);
            return Ok(PutOutcome::AlreadySucceeded);
        }

        let record = LedgerRecord {
            status,
            timestamp,
            error_detail: error_detail.map(str::to_string),
        };
        let previous = records.insert(order_id.to_string(), record);

        // 落盘失败时回滚内存，保持内存与磁盘一致
        if let Err(e) = self.persist(&records) {
            match previous {
                Some(previous) => records.insert(order_id.to_string(), previous),
                None => records.remove(order_id),
            };
            return Err(e);
        }

        Ok(PutOutcome::Written)
    }

    fn count_all(&self) -> Result<LedgerStats, LedgerError> {
        let records = self.records.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(LedgerStats::from_records(records.values()))
    }

    fn count_since(&self, cutoff: DateTime<Utc>) -> Result<usize, LedgerError> {
        let records = self.records.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(records
            .values()
            .filter(|record| record.timestamp >= cutoff)
            .count())
    }
}
