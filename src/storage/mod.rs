//! 持久化层
//!
//! 台账是"订单是否已处理"的唯一依据，内存中的任何统计都从这里查询得出

pub mod json_ledger;
pub mod ledger;

pub use json_ledger::JsonFileLedger;
pub use ledger::{Ledger, LedgerRecord, LedgerStats, LedgerStatus, PutOutcome};
