//! # Refund Contest
//!
//! 定时拉取存在退款纠纷的订单，调用 LLM 生成申诉文本并提交到订单平台，
//! 用持久化台账保证每个订单只成功申诉一次。
//!
//! ## 架构设计
//!
//! ### ① 持久化层（Storage）
//! - `storage/` - 订单台账，"是否已处理"的唯一依据
//!
//! ### ② 外部客户端（Clients）
//! - `PlatformClient` - 订单查询 + 申诉提交（HTTP）
//! - `LlmClient` / `GeminiClient` - 模型调用
//!
//! ### ③ 业务能力层（Services）
//! - `OrderSource` / `Composer` / `AppealSubmitter` - 能力接口
//! - `ContestationJournal` - 申诉与周期日志
//!
//! ### ④ 流程层（Workflow）
//! - `AppealFlow` - 单个订单：查台账 → 生成 → 提交 → 写台账
//!
//! ### ⑤ 编排层（Orchestration）
//! - `CycleRunner` - 一个周期：分页拉取 → 逐个订单 → 汇总
//! - `Scheduler` - 固定间隔循环执行周期
//! - `App` - 应用生命周期

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod storage;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, LlmProvider};
pub use error::{CompositionError, CycleError, DiscoveryError, LedgerError, SubmissionError};
pub use models::{CycleResult, OrderCandidate, TimeWindow};
pub use orchestrator::{App, CycleRunner, Scheduler};
pub use storage::{JsonFileLedger, Ledger, LedgerStatus};
pub use workflow::AppealFlow;
