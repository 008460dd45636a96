pub mod gemini_client;
pub mod llm_client;
pub mod platform_client;

pub use gemini_client::GeminiClient;
pub use llm_client::LlmClient;
pub use platform_client::PlatformClient;
