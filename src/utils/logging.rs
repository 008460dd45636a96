//! 日志工具模块
//!
//! 负责 tracing 初始化，以及启动横幅、周期汇总、台账统计等固定格式输出
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{CycleResult, TimeWindow};
use crate::storage::LedgerStats;

/// 初始化 tracing，默认级别 info，可用 `RUST_LOG` 覆盖
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 退款申诉自动化系统启动");
    info!("🧠 LLM 服务商: {}", config.llm_provider);
    info!("🤖 模型: {}", config.llm_model_name);
    info!("🌐 平台 API: {}", config.platform_api_base_url);
    info!(
        "⏱️  周期间隔: {} 秒 | 回溯: {} 天 (首次补查 {} 天) | 每页 {} 条",
        config.cycle_interval_secs, config.lookback_days, config.catch_up_days, config.page_size
    );
    info!("{}", "=".repeat(60));
}

/// 输出台账统计
pub fn log_ledger_stats(title: &str, stats: &LedgerStats) {
    info!("📊 {}:", title);
    info!("   - 总处理数: {}", stats.total);
    info!("   - 成功: {}", stats.succeeded);
    info!("   - 失败: {}", stats.failed);
    match stats.last_timestamp {
        Some(ts) => info!(
            "   - 最近处理: {}",
            ts.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
        ),
        None => info!("   - 最近处理: 无"),
    }
}

/// 记录周期开始
pub fn log_cycle_start(cycle_number: u64, window: &TimeWindow) {
    info!("\n{}", "=".repeat(60));
    info!(
        "🔄 周期 #{} - {}",
        cycle_number,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📅 查询区间: {}", window);
    info!("{}", "=".repeat(60));
}

/// 输出周期汇总，以及台账总数和今日处理数（查询失败时传 `None`）
pub fn log_cycle_summary(
    cycle_number: u64,
    result: &CycleResult,
    ledger_total: Option<usize>,
    processed_today: Option<usize>,
) {
    info!("\n{}", "─".repeat(60));
    info!("📊 周期 #{} 汇总", cycle_number);
    info!("{}", "─".repeat(60));
    info!("📋 拉取订单: {}", result.found());
    info!("✅ 已提交申诉: {}", result.appeals_sent);
    info!("⏭️  跳过 (已申诉): {}", result.appeals_skipped);
    info!("❌ 错误: {}", result.errors.len());
    if let (Some(total), Some(today)) = (ledger_total, processed_today) {
        info!("📈 台账总数: {} | 今日处理: {}", total, today);
    }
    info!("{}", "─".repeat(60));

    if result.has_errors() {
        warn!("⚠️  本周期错误:");
        for (i, err) in result.errors.iter().enumerate() {
            warn!("   {}. {}", i + 1, err);
        }
    }
}

/// 记录周期级失败
pub fn log_cycle_failure(cycle_number: u64, err: &dyn std::error::Error) {
    error!("❌ 周期 #{} 失败: {}", cycle_number, err);
    let mut source = err.source();
    while let Some(cause) = source {
        error!("   原因: {}", cause);
        source = cause.source();
    }
}

/// 记录下次执行时间
pub fn log_next_run(wait: std::time::Duration, next_run: chrono::DateTime<chrono::Local>) {
    info!(
        "⏰ 下次执行: {} 秒后 ({})，按 Ctrl+C 停止",
        wait.as_secs(),
        next_run.format("%H:%M:%S")
    );
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
