//! 调度器集成测试：手动时钟驱动多个周期

mod common;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use common::{local, temp_ledger, FakeComposer, FakeSource, FakeSubmitter, ManualClock};
use refund_contest::error::CompositionError;
use refund_contest::models::OrderCandidate;
use refund_contest::orchestrator::{ScheduleSettings, SchedulerState};
use refund_contest::services::Composer;
use refund_contest::storage::{Ledger, LedgerStatus};
use refund_contest::{AppealFlow, CycleRunner, Scheduler};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn settings() -> ScheduleSettings {
    ScheduleSettings {
        interval: Duration::from_secs(12 * 3600),
        page_size: 50,
        lookback_days: 1,
        catch_up_days: 7,
    }
}

fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, m, d).unwrap()
}

#[tokio::test]
async fn test_runs_cycles_until_shutdown() {
    let (_dir, ledger) = temp_ledger();
    let source = Arc::new(FakeSource::with_orders(&["1", "2"]));
    let submitter = Arc::new(FakeSubmitter::default());
    let flow = AppealFlow::new(
        ledger.clone(),
        Arc::new(FakeComposer::default()),
        submitter.clone(),
    );
    let shutdown = CancellationToken::new();
    let clock = Arc::new(ManualClock::new(local(2026, 10, 19, 8), 3, shutdown.clone()));

    let mut scheduler = Scheduler::new(
        CycleRunner::new(source.clone(), flow),
        ledger.clone(),
        clock.clone(),
        settings(),
    );
    assert_eq!(scheduler.state(), SchedulerState::Idle);

    let report = scheduler.run(shutdown).await;

    assert_eq!(report.cycles_started, 3);
    assert_eq!(report.cycles_failed, 0);
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(clock.sleep_count(), 3);
    assert!(clock
        .sleeps
        .lock()
        .unwrap()
        .iter()
        .all(|d| *d == settings().interval));

    let stats = report.final_stats.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.succeeded, 2);
    assert_eq!(submitter.submitted("1"), 1);
    assert_eq!(submitter.submitted("2"), 1);
}

#[tokio::test]
async fn test_window_is_recomputed_each_cycle() {
    let (_dir, ledger) = temp_ledger();
    let source = Arc::new(FakeSource::with_orders(&["1"]));
    let flow = AppealFlow::new(
        ledger.clone(),
        Arc::new(FakeComposer::default()),
        Arc::new(FakeSubmitter::default()),
    );
    let shutdown = CancellationToken::new();
    let clock = Arc::new(ManualClock::new(local(2026, 10, 19, 8), 3, shutdown.clone()));

    let mut scheduler = Scheduler::new(
        CycleRunner::new(source.clone(), flow),
        ledger,
        clock,
        settings(),
    );
    scheduler.run(shutdown).await;

    let windows = source.windows();
    assert_eq!(windows.len(), 3);
    // 台账为空的首个周期补查 7 天
    assert_eq!((windows[0].start(), windows[0].end()), (day(10, 12), day(10, 19)));
    assert_eq!((windows[1].start(), windows[1].end()), (day(10, 18), day(10, 19)));
    assert_eq!((windows[2].start(), windows[2].end()), (day(10, 19), day(10, 20)));
}

#[tokio::test]
async fn test_first_cycle_uses_regular_window_when_ledger_has_history() {
    let (_dir, ledger) = temp_ledger();
    ledger
        .put("old", LedgerStatus::Succeeded, Utc::now(), None)
        .unwrap();
    let source = Arc::new(FakeSource::with_orders(&[]));
    let flow = AppealFlow::new(
        ledger.clone(),
        Arc::new(FakeComposer::default()),
        Arc::new(FakeSubmitter::default()),
    );
    let shutdown = CancellationToken::new();
    let clock = Arc::new(ManualClock::new(local(2026, 10, 19, 8), 1, shutdown.clone()));

    let mut scheduler = Scheduler::new(CycleRunner::new(source.clone(), flow), ledger, clock, settings());
    let report = scheduler.run(shutdown).await;

    assert_eq!(report.cycles_started, 1);
    let windows = source.windows();
    assert_eq!((windows[0].start(), windows[0].end()), (day(10, 18), day(10, 19)));
}

#[tokio::test]
async fn test_failed_and_panicking_cycles_do_not_stop_the_loop() {
    let (_dir, ledger) = temp_ledger();
    let source = Arc::new(FakeSource::with_orders(&["7"]));
    // 第一个周期 panic，第二个周期拉取失败，第三个周期正常
    source.panic_next_fetch();
    source.fail_next_fetch();
    let submitter = Arc::new(FakeSubmitter::default());
    let flow = AppealFlow::new(
        ledger.clone(),
        Arc::new(FakeComposer::default()),
        submitter.clone(),
    );
    let shutdown = CancellationToken::new();
    let clock = Arc::new(ManualClock::new(local(2026, 10, 19, 8), 3, shutdown.clone()));

    let mut scheduler = Scheduler::new(
        CycleRunner::new(source.clone(), flow),
        ledger,
        clock,
        settings(),
    );
    let report = scheduler.run(shutdown).await;

    assert_eq!(report.cycles_started, 3);
    assert_eq!(report.cycles_failed, 2);
    assert_eq!(submitter.submitted("7"), 1);
    assert_eq!(report.final_stats.unwrap().succeeded, 1);
}

/// 生成到一半时收到停止信号，之后永远不返回
struct InterruptedComposer {
    shutdown: CancellationToken,
}

#[async_trait]
impl Composer for InterruptedComposer {
    fn provider(&self) -> &str {
        "interrupted"
    }

    async fn compose(&self, _order: &OrderCandidate) -> Result<String, CompositionError> {
        self.shutdown.cancel();
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_shutdown_mid_cycle_leaves_order_unrecorded() {
    let (_dir, ledger) = temp_ledger();
    let shutdown = CancellationToken::new();
    let submitter = Arc::new(FakeSubmitter::default());
    let flow = AppealFlow::new(
        ledger.clone(),
        Arc::new(InterruptedComposer {
            shutdown: shutdown.clone(),
        }),
        submitter.clone(),
    );
    let clock = Arc::new(ManualClock::new(local(2026, 10, 19, 8), 10, shutdown.clone()));

    let mut scheduler = Scheduler::new(
        CycleRunner::new(Arc::new(FakeSource::with_orders(&["8"])), flow),
        ledger.clone(),
        clock.clone(),
        settings(),
    );
    let report = scheduler.run(shutdown).await;

    assert_eq!(report.cycles_started, 1);
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(clock.sleep_count(), 0);
    assert!(ledger.get("8").unwrap().is_none());
    assert_eq!(submitter.submitted("8"), 0);
}

#[tokio::test]
async fn test_already_cancelled_runs_no_cycle() {
    let (_dir, ledger) = temp_ledger();
    let source = Arc::new(FakeSource::with_orders(&["1"]));
    let flow = AppealFlow::new(
        ledger.clone(),
        Arc::new(FakeComposer::default()),
        Arc::new(FakeSubmitter::default()),
    );
    let shutdown = CancellationToken::new();
    shutdown.cancel();
    let clock = Arc::new(ManualClock::new(local(2026, 10, 19, 8), 1, shutdown.clone()));

    let mut scheduler = Scheduler::new(CycleRunner::new(source.clone(), flow), ledger, clock, settings());
    let report = scheduler.run(shutdown).await;

    assert_eq!(report.cycles_started, 0);
    assert!(source.windows().is_empty());
    assert_eq!(report.final_stats.unwrap().total, 0);
}

#[tokio::test]
async fn test_huge_lookback_does_not_crash_the_loop() {
    let (_dir, ledger) = temp_ledger();
    let source = Arc::new(FakeSource::with_orders(&["1"]));
    let flow = AppealFlow::new(
        ledger.clone(),
        Arc::new(FakeComposer::default()),
        Arc::new(FakeSubmitter::default()),
    );
    let shutdown = CancellationToken::new();
    let clock = Arc::new(ManualClock::new(local(2026, 10, 19, 8), 2, shutdown.clone()));
    let settings = ScheduleSettings {
        lookback_days: 100_000_000,
        catch_up_days: 100_000_000,
        ..settings()
    };

    let mut scheduler = Scheduler::new(CycleRunner::new(source.clone(), flow), ledger, clock, settings);
    let report = scheduler.run(shutdown).await;

    assert_eq!(report.cycles_started, 2);
    assert_eq!(report.cycles_failed, 0);
    let windows = source.windows();
    assert_eq!(windows[0].start(), NaiveDate::MIN);
    assert_eq!(windows[0].end(), day(10, 19));
}
