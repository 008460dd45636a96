use serde::Deserialize;
use std::fmt::{self, Display};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// 配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "REFUND_CONTEST_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";
/// 回溯天数上限（约十年）
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

/// 申诉文本由哪家模型生成
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum LlmProvider {
    /// OpenAI 以及兼容 OpenAI API 的服务
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "gemini")]
    Gemini,
}

impl LlmProvider {
    /// 该服务商的默认 API 地址
    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "https://api.openai.com/v1",
            LlmProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "openai-compatible" => Ok(LlmProvider::OpenAi),
            "gemini" => Ok(LlmProvider::Gemini),
            other => Err(ConfigError::invalid(
                "llm_provider",
                format!("未知的服务商 '{}'，可选 openai / gemini", other),
            )),
        }
    }
}

impl Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::OpenAi => write!(f, "OPENAI"),
            LlmProvider::Gemini => write!(f, "GEMINI"),
        }
    }
}

/// 程序配置
///
/// 加载顺序：默认值 → `config.toml`（可选）→ 环境变量
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 订单平台 API ---
    pub platform_api_base_url: String,
    pub platform_api_token: String,
    /// 单次 HTTP 请求超时（秒）
    pub request_timeout_secs: u64,
    // --- LLM 配置 ---
    pub llm_provider: LlmProvider,
    pub llm_api_key: String,
    /// 为空时使用服务商默认地址
    pub llm_api_base_url: Option<String>,
    pub llm_model_name: String,
    /// 单次生成申诉文本的超时（秒）
    pub compose_timeout_secs: u64,
    // --- 周期 ---
    /// 每页拉取的订单数
    pub page_size: u32,
    /// 两个周期之间的等待时间（秒）
    pub cycle_interval_secs: u64,
    /// 每个周期回溯的天数
    pub lookback_days: u32,
    /// 台账为空时首个周期回溯的天数
    pub catch_up_days: u32,
    // --- 输出 ---
    pub ledger_path: String,
    pub log_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform_api_base_url: "http://localhost:8080/api".to_string(),
            platform_api_token: String::new(),
            request_timeout_secs: 30,
            llm_provider: LlmProvider::OpenAi,
            llm_api_key: String::new(),
            llm_api_base_url: None,
            llm_model_name: "gpt-4o-mini".to_string(),
            compose_timeout_secs: 60,
            page_size: 50,
            cycle_interval_secs: 900,
            lookback_days: 1,
            catch_up_days: 7,
            ledger_path: "data/processed_orders.json".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}

impl Config {
    /// 读取配置文件和环境变量，并校验
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut config = Self::from_file_or_default(Path::new(&path))?;
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 文件不存在时返回默认配置
    pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 用环境变量覆盖配置项，`lookup` 便于测试时注入
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("PLATFORM_API_BASE_URL") {
            self.platform_api_base_url = v;
        }
        if let Some(v) = lookup("PLATFORM_API_TOKEN") {
            self.platform_api_token = v;
        }
        if let Some(v) = lookup("LLM_PROVIDER") {
            self.llm_provider = v.parse()?;
        }
        if let Some(v) = lookup("LLM_API_KEY") {
            self.llm_api_key = v;
        }
        if let Some(v) = lookup("LLM_API_BASE_URL") {
            self.llm_api_base_url = Some(v).filter(|v| !v.trim().is_empty());
        }
        if let Some(v) = lookup("LLM_MODEL_NAME") {
            self.llm_model_name = v;
        }
        if let Some(v) = lookup("LEDGER_PATH") {
            self.ledger_path = v;
        }
        if let Some(v) = lookup("LOG_DIR") {
            self.log_dir = v;
        }

        parse_env(&lookup, "REQUEST_TIMEOUT_SECS", &mut self.request_timeout_secs)?;
        parse_env(&lookup, "COMPOSE_TIMEOUT_SECS", &mut self.compose_timeout_secs)?;
        parse_env(&lookup, "PAGE_SIZE", &mut self.page_size)?;
        parse_env(&lookup, "CYCLE_INTERVAL_SECS", &mut self.cycle_interval_secs)?;
        parse_env(&lookup, "LOOKBACK_DAYS", &mut self.lookback_days)?;
        parse_env(&lookup, "CATCH_UP_DAYS", &mut self.catch_up_days)?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.platform_api_base_url.trim().is_empty() {
            return Err(ConfigError::invalid("platform_api_base_url", "不能为空"));
        }
        if self.page_size == 0 {
            return Err(ConfigError::invalid("page_size", "必须大于 0"));
        }
        if self.cycle_interval_secs == 0 {
            return Err(ConfigError::invalid("cycle_interval_secs", "必须大于 0"));
        }
        if self.compose_timeout_secs == 0 {
            return Err(ConfigError::invalid("compose_timeout_secs", "必须大于 0"));
        }
        if self.lookback_days == 0 {
            return Err(ConfigError::invalid("lookback_days", "必须大于 0"));
        }
        if self.catch_up_days > MAX_LOOKBACK_DAYS {
            return Err(ConfigError::invalid(
                "catch_up_days",
                format!("不能大于 {}", MAX_LOOKBACK_DAYS),
            ));
        }
        if self.catch_up_days < self.lookback_days {
            return Err(ConfigError::invalid(
                "catch_up_days",
                format!("不能小于 lookback_days ({})", self.lookback_days),
            ));
        }
        Ok(())
    }

    pub fn llm_base_url(&self) -> &str {
        self.llm_api_base_url
            .as_deref()
            .unwrap_or_else(|| self.llm_provider.default_base_url())
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn compose_timeout(&self) -> Duration {
        Duration::from_secs(self.compose_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_env<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var_name: &str,
    target: &mut T,
) -> Result<(), ConfigError> {
    if let Some(value) = lookup(var_name) {
        *target = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value: value.clone(),
                expected_type: std::any::type_name::<T>().to_string(),
            })?;
    }
    Ok(())
}
