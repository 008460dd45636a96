pub mod capabilities;
pub mod composer;
pub mod journal;
pub mod prompt;

pub use capabilities::{AppealSubmitter, Composer, OrderSource};
pub use composer::{build_composer, GeminiComposer, OpenAiComposer};
pub use journal::ContestationJournal;
