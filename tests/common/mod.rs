//! 集成测试共用的假协作方
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use refund_contest::error::{CompositionError, DiscoveryError, LedgerError, SubmissionError};
use refund_contest::models::{DisputeDetails, OrderCandidate, OrderPage, TimeWindow};
use refund_contest::services::{AppealSubmitter, Composer, OrderSource};
use refund_contest::storage::{JsonFileLedger, Ledger, LedgerRecord, LedgerStats, LedgerStatus, PutOutcome};
use refund_contest::utils::Clock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub fn order(id: &str) -> OrderCandidate {
    OrderCandidate::new(
        id,
        DisputeDetails {
            reason: "Produto diferente do anunciado".to_string(),
            amount: 89.9,
            currency: "BRL".to_string(),
            requested_at: None,
            updated_at: None,
            buyer_message: Some("Quero meu dinheiro de volta".to_string()),
        },
    )
}

/// 按 offset 分页返回当前订单列表
#[derive(Default)]
pub struct FakeSource {
    orders: Mutex<Vec<OrderCandidate>>,
    pub windows: Mutex<Vec<TimeWindow>>,
    fail_next: AtomicBool,
    panic_next: AtomicBool,
}

impl FakeSource {
    pub fn with_orders(ids: &[&str]) -> Self {
        let source = Self::default();
        source.set_orders(ids);
        source
    }

    pub fn set_orders(&self, ids: &[&str]) {
        *self.orders.lock().unwrap() = ids.iter().map(|id| order(id)).collect();
    }

    pub fn fail_next_fetch(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn panic_next_fetch(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    pub fn windows(&self) -> Vec<TimeWindow> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderSource for FakeSource {
    async fn fetch_page(
        &self,
        window: &TimeWindow,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<OrderPage, DiscoveryError> {
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("plataforma devolveu algo inesperado");
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(DiscoveryError::RequestFailed {
                endpoint: "/orders".to_string(),
                source: "connection refused".into(),
            });
        }

        let offset: usize = match page_token {
            None => {
                self.windows.lock().unwrap().push(*window);
                0
            }
            Some(token) => token.parse().unwrap(),
        };

        let orders = self.orders.lock().unwrap();
        let end = (offset + page_size as usize).min(orders.len());
        Ok(OrderPage {
            orders: orders[offset..end].to_vec(),
            next_page_token: (end < orders.len()).then(|| end.to_string()),
        })
    }
}

/// 记录每个订单的调用次数，可指定失败的订单
#[derive(Default)]
pub struct FakeComposer {
    pub calls: Mutex<HashMap<String, usize>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeComposer {
    pub fn fail_for(&self, order_id: &str) {
        self.failing.lock().unwrap().insert(order_id.to_string());
    }

    pub fn calls_for(&self, order_id: &str) -> usize {
        self.calls.lock().unwrap().get(order_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Composer for FakeComposer {
    fn provider(&self) -> &str {
        "fake"
    }

    async fn compose(&self, order: &OrderCandidate) -> Result<String, CompositionError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(order.order_id.clone())
            .or_default() += 1;
        if self.failing.lock().unwrap().contains(&order.order_id) {
            return Err(CompositionError::new("modelo indisponível"));
        }
        Ok(format!("Contestação para o pedido {}", order.order_id))
    }
}

#[derive(Default)]
pub struct FakeSubmitter {
    pub submissions: Mutex<Vec<(String, String)>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeSubmitter {
    pub fn fail_for(&self, order_id: &str) {
        self.failing.lock().unwrap().insert(order_id.to_string());
    }

    pub fn succeed_for(&self, order_id: &str) {
        self.failing.lock().unwrap().remove(order_id);
    }

    /// 某个订单被成功提交的次数
    pub fn submitted(&self, order_id: &str) -> usize {
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == order_id)
            .count()
    }
}

#[async_trait]
impl AppealSubmitter for FakeSubmitter {
    async fn submit(&self, order_id: &str, text: &str) -> Result<(), SubmissionError> {
        if self.failing.lock().unwrap().contains(order_id) {
            return Err(SubmissionError::new("plataforma recusou (500)"));
        }
        self.submissions
            .lock()
            .unwrap()
            .push((order_id.to_string(), text.to_string()));
        Ok(())
    }
}

/// 可以让写入失败的台账
pub struct FlakyLedger {
    inner: JsonFileLedger,
    pub fail_writes: AtomicBool,
}

impl FlakyLedger {
    pub fn new(inner: JsonFileLedger) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
        }
    }
}

impl Ledger for FlakyLedger {
    fn get(&self, order_id: &str) -> Result<Option<LedgerRecord>, LedgerError> {
        self.inner.get(order_id)
    }

    fn put(
        &self,
        order_id: &str,
        status: LedgerStatus,
        timestamp: DateTime<Utc>,
        error_detail: Option<&str>,
    ) -> Result<PutOutcome, LedgerError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Io {
                path: "ledger.json".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.inner.put(order_id, status, timestamp, error_detail)
    }

    fn count_all(&self) -> Result<LedgerStats, LedgerError> {
        self.inner.count_all()
    }

    fn count_since(&self, cutoff: DateTime<Utc>) -> Result<usize, LedgerError> {
        self.inner.count_since(cutoff)
    }
}

/// 手动时钟：sleep 立即返回并推进时间，达到次数后取消调度
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
    pub sleeps: Mutex<Vec<Duration>>,
    stop_after: usize,
    shutdown: CancellationToken,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>, stop_after: usize, shutdown: CancellationToken) -> Self {
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
            stop_after,
            shutdown,
        }
    }

    pub fn sleep_count(&self) -> usize {
        self.sleeps.lock().unwrap().len()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        let count = {
            let mut sleeps = self.sleeps.lock().unwrap();
            sleeps.push(duration);
            sleeps.len()
        };
        {
            let mut now = self.now.lock().unwrap();
            *now = *now + chrono::Duration::from_std(duration).unwrap();
        }
        if count >= self.stop_after {
            self.shutdown.cancel();
        }
    }
}

pub fn local(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn temp_ledger() -> (tempfile::TempDir, Arc<JsonFileLedger>) {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(JsonFileLedger::open(dir.path().join("processed_orders.json")).unwrap());
    (dir, ledger)
}
