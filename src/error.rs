use thiserror::Error;

/// 订阅服务错误
///
/// 只描述"无法发起注册"的情况；注册本身的成败通过 `RegistrationOutcome` 返回
#[derive(Error, Debug)]
pub enum RegisterError {
    /// 已有一个注册请求在进行中
    #[error("Registration already in progress (attempt {attempt_id})")]
    Busy { attempt_id: String },

    #[error("No async runtime available: {0}")]
    NoRuntime(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 注册任务在交付结果之前被丢弃
    #[error("Registration task dropped before completion")]
    Dropped,
}

impl RegisterError {
    /// 获取标准错误代码，用于日志分析
    pub fn error_code(&self) -> &'static str {
        match self {
            RegisterError::Busy { .. } => "REGISTRATION_BUSY",
            RegisterError::NoRuntime(_) => "NO_RUNTIME",
            RegisterError::Transport(_) => "TRANSPORT_ERROR",
            RegisterError::Config(_) => "INVALID_CONFIG",
            RegisterError::Dropped => "DROPPED",
        }
    }
}

impl From<reqwest::Error> for RegisterError {
    fn from(err: reqwest::Error) -> Self {
        RegisterError::Transport(err.to_string())
    }
}

impl From<rustls::Error> for RegisterError {
    fn from(err: rustls::Error) -> Self {
        RegisterError::Transport(format!("TLS setup failed: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    Missing(String),
}

/// 用户存储错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// 设备平台错误
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Platform initialization failed: {0}")]
    Initialize(String),

    #[error("Failed to retrieve device details: {0}")]
    Details(String),
}
