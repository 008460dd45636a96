//! 应用生命周期
//!
//! 1. **初始化**：创建平台客户端、申诉生成服务、台账和申诉日志
//! 2. **运行**：启动调度器，Ctrl+C 触发停止
//! 3. **退出**：输出最终台账统计，释放外部资源

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::clients::PlatformClient;
use crate::config::Config;
use crate::orchestrator::{CycleRunner, ScheduleSettings, Scheduler, SchedulerReport};
use crate::services::{build_composer, Composer, ContestationJournal};
use crate::storage::{JsonFileLedger, Ledger};
use crate::utils::logging;
use crate::utils::SystemClock;
use crate::workflow::AppealFlow;

/// 应用主结构
pub struct App {
    config: Config,
    scheduler: Scheduler,
}

impl App {
    /// 初始化应用，任何协作方创建失败都直接返回错误，不进入循环
    pub fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        info!("🌐 初始化平台客户端...");
        let platform = Arc::new(PlatformClient::new(&config)?);

        info!("🧠 初始化 {}...", config.llm_provider);
        let composer: Arc<dyn Composer> = Arc::from(build_composer(&config)?);

        info!("💾 初始化台账...");
        let ledger: Arc<dyn Ledger> = Arc::new(
            JsonFileLedger::open(&config.ledger_path)
                .with_context(|| format!("无法打开台账: {}", config.ledger_path))?,
        );
        let stats = ledger.count_all().context("无法读取台账统计")?;
        logging::log_ledger_stats("台账统计", &stats);

        let journal = Arc::new(ContestationJournal::new(&config.log_dir));

        let flow = AppealFlow::new(ledger.clone(), composer, platform.clone())
            .with_journal(journal.clone());
        let runner = CycleRunner::new(platform, flow);
        let scheduler = Scheduler::new(
            runner,
            ledger,
            Arc::new(SystemClock),
            ScheduleSettings::from_config(&config),
        )
        .with_journal(journal);

        Ok(Self { config, scheduler })
    }

    /// 运行直到收到 Ctrl+C
    pub async fn run(mut self) -> Result<()> {
        let shutdown = CancellationToken::new();

        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("⏸️  收到停止信号，正在退出...");
                signal_token.cancel();
            }
        });

        info!("{}", "=".repeat(60));
        info!("🔄 持续运行模式，按 Ctrl+C 停止");
        info!("{}", "=".repeat(60));

        let report = self.scheduler.run(shutdown).await;
        self.shutdown(report);

        Ok(())
    }

    fn shutdown(self, report: SchedulerReport) {
        info!("\n{}", "=".repeat(60));
        info!(
            "⏹️  系统已停止 (周期: {}, 失败: {})",
            report.cycles_started, report.cycles_failed
        );
        if let Some(stats) = &report.final_stats {
            logging::log_ledger_stats("最终统计", stats);
        }
        info!("✅ 数据已保存至:");
        info!("   - {}", self.config.ledger_path);
        info!("   - {}/contestations_*.txt", self.config.log_dir);
        info!("   - {}/cycles_*.txt", self.config.log_dir);
        info!("{}", "=".repeat(60));

        // 释放 HTTP 客户端和台账
        drop(self.scheduler);
    }
}
