pub mod appeal_flow;

pub use appeal_flow::{AppealFlow, AppealOutcome};
