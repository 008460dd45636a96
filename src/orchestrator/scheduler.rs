//! 周期调度器 - 编排层
//!
//! 无限循环执行周期，周期之间固定等待 `interval`（从上个周期结束开始计时）：
//!
//! ```text
//! Idle → Running(1) → Waiting → Running(2) → ... → Stopped
//! ```
//!
//! - 每个周期开始时才根据"现在"计算时间窗口
//! - 周期返回的错误、甚至 panic 都只记日志，不终止循环
//! - 只有 `shutdown` 被取消才退出；取消可以发生在等待期间或周期进行中，
//!   进行中的订单没有台账记录，下个周期会重新处理

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::CycleError;
use crate::models::{CycleResult, TimeWindow};
use crate::orchestrator::CycleRunner;
use crate::services::ContestationJournal;
use crate::storage::{Ledger, LedgerStats};
use crate::utils::clock::{local_midnight_utc, Clock};
use crate::utils::logging;

/// 调度参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    pub interval: Duration,
    pub page_size: u32,
    pub lookback_days: u32,
    /// 台账为空时首个周期的回溯天数
    pub catch_up_days: u32,
}

impl ScheduleSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.cycle_interval(),
            page_size: config.page_size,
            lookback_days: config.lookback_days,
            catch_up_days: config.catch_up_days,
        }
    }
}

/// 调度器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running(u64),
    Waiting,
    Stopped,
}

/// 调度器退出时的汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    /// 开始过的周期数（包括被中断的）
    pub cycles_started: u64,
    /// 以错误或 panic 结束的周期数
    pub cycles_failed: u64,
    /// 退出时的台账汇总；台账不可读时为空
    pub final_stats: Option<LedgerStats>,
}

pub struct Scheduler {
    runner: CycleRunner,
    ledger: Arc<dyn Ledger>,
    clock: Arc<dyn Clock>,
    journal: Option<Arc<ContestationJournal>>,
    settings: ScheduleSettings,
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(
        runner: CycleRunner,
        ledger: Arc<dyn Ledger>,
        clock: Arc<dyn Clock>,
        settings: ScheduleSettings,
    ) -> Self {
        Self {
            runner,
            ledger,
            clock,
            journal: None,
            settings,
            state: SchedulerState::Idle,
        }
    }

    /// 周期汇总同时写入申诉日志
    pub fn with_journal(mut self, journal: Arc<ContestationJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// 运行直到 `shutdown` 被取消
    pub async fn run(&mut self, shutdown: CancellationToken) -> SchedulerReport {
        let mut report = SchedulerReport::default();
        let mut cycle_number = 0u64;

        while !shutdown.is_cancelled() {
            cycle_number += 1;
            report.cycles_started = cycle_number;
            self.transition(SchedulerState::Running(cycle_number));

            let window = self.window_for(cycle_number);
            logging::log_cycle_start(cycle_number, &window);

            let cycle = AssertUnwindSafe(self.runner.run_cycle(&window, self.settings.page_size))
                .catch_unwind();

            let outcome = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    warn!("⏸️  周期 #{} 进行中收到停止信号，未完成的订单将在下次运行时重新处理", cycle_number);
                    break;
                }
                outcome = cycle => outcome,
            };

            let succeeded = match outcome {
                Ok(Ok(result)) => {
                    self.report_cycle(cycle_number, &window, &result).await;
                    true
                }
                Ok(Err(err)) => {
                    logging::log_cycle_failure(cycle_number, &err);
                    if let CycleError::Ledger { .. } = err {
                        error!("❌ 台账写入失败，请检查存储后再继续，否则可能重复申诉");
                    }
                    self.report_cycle(cycle_number, &window, err.partial()).await;
                    false
                }
                Err(panic) => {
                    error!(
                        "❌ 周期 #{} 发生未预期的异常: {}",
                        cycle_number,
                        panic_message(panic.as_ref())
                    );
                    false
                }
            };
            if !succeeded {
                report.cycles_failed += 1;
            }

            if shutdown.is_cancelled() {
                break;
            }

            self.transition(SchedulerState::Waiting);
            let next_run = self.clock.now()
                + chrono::Duration::from_std(self.settings.interval)
                    .unwrap_or_else(|_| chrono::Duration::zero());
            logging::log_next_run(self.settings.interval, next_run);

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = self.clock.sleep(self.settings.interval) => {}
            }
        }

        self.transition(SchedulerState::Stopped);
        info!("⏹️  调度器已停止，共执行 {} 个周期", report.cycles_started);

        report.final_stats = match self.ledger.count_all() {
            Ok(stats) => Some(stats),
            Err(e) => {
                error!("❌ 读取台账统计失败: {}", e);
                None
            }
        };
        report
    }

    /// 计算本周期的查询窗口
    ///
    /// 首个周期且台账为空时使用补查天数，其余周期使用常规回溯天数
    fn window_for(&self, cycle_number: u64) -> TimeWindow {
        let today = self.clock.now().date_naive();

        let first_run = cycle_number == 1
            && match self.ledger.count_all() {
                Ok(stats) => stats.total == 0,
                Err(e) => {
                    warn!("⚠️ 读取台账统计失败，使用常规回溯窗口: {}", e);
                    false
                }
            };

        let days = if first_run {
            info!(
                "🆕 台账为空，首个周期补查最近 {} 天",
                self.settings.catch_up_days
            );
            self.settings.catch_up_days
        } else {
            self.settings.lookback_days
        };

        TimeWindow::looking_back(today, days)
    }

    async fn report_cycle(&self, cycle_number: u64, window: &TimeWindow, result: &CycleResult) {
        let cutoff = local_midnight_utc(self.clock.now());
        let total = self.ledger.count_all().ok().map(|stats| stats.total);
        let today = self.ledger.count_since(cutoff).ok();

        logging::log_cycle_summary(cycle_number, result, total, today);

        if let Some(journal) = &self.journal {
            if let Err(e) = journal.record_cycle(cycle_number, window, result).await {
                warn!("⚠️ 周期日志写入失败: {}", e);
            }
        }
    }

    fn transition(&mut self, next: SchedulerState) {
        debug!("调度器状态: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "未知 panic".to_string()
    }
}
