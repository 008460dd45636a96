//! 错误类型
//!
//! 按照失败的影响范围划分：
//! - 订单级（`CompositionError` / `SubmissionError`）：只影响当前订单，记入台账为 `failed`
//! - 周期级（`DiscoveryError` / `LedgerError`）：终止当前周期，由调度器记录后继续下一周期
//! - 启动级（`ConfigError`）：进程在进入循环之前退出

use thiserror::Error;

use crate::models::CycleResult;

// ========== 订单来源 ==========

/// 分页拉取订单失败
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// 网络请求失败
    #[error("订单查询请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 平台返回错误响应
    #[error("订单查询返回错误响应 ({endpoint}): status={status}, message={message}")]
    BadResponse {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// 鉴权失败
    #[error("订单查询鉴权失败 ({endpoint}): status={status}")]
    Unauthorized { endpoint: String, status: u16 },
    /// 响应体解析失败
    #[error("订单响应解析失败: {0}")]
    Decode(String),
}

// ========== 订单级失败 ==========

/// 生成申诉文本失败（超时、模型报错、输出无效）
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("申诉文本生成失败: {reason}")]
pub struct CompositionError {
    pub reason: String,
}

impl CompositionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// 提交申诉失败（网络、平台拒绝、鉴权）
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("申诉提交失败: {reason}")]
pub struct SubmissionError {
    pub reason: String,
}

impl SubmissionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

// ========== 台账 ==========

/// 台账读写失败
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("台账文件读写失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("台账文件格式错误 ({path}): {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("台账序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("台账锁已损坏")]
    Poisoned,
}

// ========== 周期 ==========

/// 周期级失败，携带失败前已经累积的部分结果
#[derive(Debug, Error)]
pub enum CycleError {
    /// 拉取订单失败；已拉到的订单仍然处理完毕
    #[error("订单拉取失败: {source}")]
    Discovery {
        #[source]
        source: DiscoveryError,
        partial: CycleResult,
    },
    /// 台账写入失败，不能保证幂等，立即终止本周期
    #[error("订单 {order_id} 台账写入失败: {source}")]
    Ledger {
        order_id: String,
        #[source]
        source: LedgerError,
        partial: CycleResult,
    },
}

impl CycleError {
    /// 失败前已经累积的周期结果
    pub fn partial(&self) -> &CycleResult {
        match self {
            CycleError::Discovery { partial, .. } | CycleError::Ledger { partial, .. } => partial,
        }
    }
}

// ========== 配置 ==========

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 取值非法
    #[error("配置项 {field} 非法: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
