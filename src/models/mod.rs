pub mod cycle;
pub mod order;

pub use cycle::{CycleResult, OrderError, TimeWindow};
pub use order::{DisputeDetails, OrderCandidate, OrderPage};
