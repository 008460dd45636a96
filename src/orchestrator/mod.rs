//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `cycle_runner` - 周期编排器
//! - 分页拉取候选订单
//! - 逐个订单交给 `workflow::AppealFlow`
//! - 汇总周期结果
//!
//! ### `scheduler` - 周期调度器
//! - 按固定间隔循环执行周期
//! - 隔离周期级失败，响应停止信号
//!
//! ### `app` - 应用生命周期
//! - 初始化外部协作方和台账
//! - 运行调度器，退出时输出最终统计
//!
//! ## 层次关系
//!
//! ```text
//! app
//!     ↓
//! scheduler (无限循环，处理周期)
//!     ↓
//! cycle_runner (处理 Vec<OrderCandidate>)
//!     ↓
//! workflow::AppealFlow (处理单个订单)
//!     ↓
//! services (能力层：OrderSource / Composer / AppealSubmitter) + storage (台账)
//! ```

pub mod app;
pub mod cycle_runner;
pub mod scheduler;

pub use app::App;
pub use cycle_runner::CycleRunner;
pub use scheduler::{ScheduleSettings, Scheduler, SchedulerReport, SchedulerState};
