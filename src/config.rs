/// 推送发起端（Push Initiator）配置
///
/// 每次注册都会重新获取一次配置快照，核心逻辑不会修改它
use crate::error::ConfigError;
use tracing::debug;

/// 环境变量：Push Initiator 基础地址
pub const ENV_PUSH_INITIATOR_URL: &str = "PUSH_INITIATOR_URL";
/// 环境变量：注册的应用 ID
pub const ENV_PROVIDER_APP_ID: &str = "PUSH_PROVIDER_APP_ID";
/// 环境变量：是否使用公共 Push Proxy Gateway
pub const ENV_USE_PUBLIC_PPG: &str = "PUSH_USE_PUBLIC_PPG";

/// 配置快照
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Configuration {
    /// Push Initiator 基础地址 (例如 "https://pi.example.com/pushinitiator")
    pub push_initiator_url: String,

    /// 应用 ID
    pub provider_application_id: String,

    /// true 使用公共 PPG (type=public)，false 使用企业 BDS (type=bds)
    pub using_public_push_proxy_gateway: bool,
}

impl Configuration {
    pub fn new(
        push_initiator_url: impl Into<String>,
        provider_application_id: impl Into<String>,
        using_public_push_proxy_gateway: bool,
    ) -> Self {
        Self {
            push_initiator_url: push_initiator_url.into(),
            provider_application_id: provider_application_id.into(),
            using_public_push_proxy_gateway,
        }
    }

    pub fn with_push_initiator_url(mut self, url: impl Into<String>) -> Self {
        self.push_initiator_url = url.into();
        self
    }

    pub fn with_provider_application_id(mut self, app_id: impl Into<String>) -> Self {
        self.provider_application_id = app_id.into();
        self
    }

    pub fn with_public_push_proxy_gateway(mut self, public: bool) -> Self {
        self.using_public_push_proxy_gateway = public;
        self
    }

    /// 网关类型参数值
    pub fn gateway_type(&self) -> &'static str {
        if self.using_public_push_proxy_gateway {
            "public"
        } else {
            "bds"
        }
    }

    /// 从环境变量读取配置
    ///
    /// URL 与应用 ID 必须存在；`PUSH_USE_PUBLIC_PPG` 缺省为 true
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let push_initiator_url = lookup(ENV_PUSH_INITIATOR_URL)
            .ok_or_else(|| ConfigError::Missing(ENV_PUSH_INITIATOR_URL.to_string()))?;
        let provider_application_id = lookup(ENV_PROVIDER_APP_ID)
            .ok_or_else(|| ConfigError::Missing(ENV_PROVIDER_APP_ID.to_string()))?;
        let using_public_push_proxy_gateway = match lookup(ENV_USE_PUBLIC_PPG) {
            Some(value) => parse_public_gateway(&value)?,
            None => true,
        };

        Ok(Self {
            push_initiator_url,
            provider_application_id,
            using_public_push_proxy_gateway,
        })
    }
}

/// 解析网关选择：true/1/yes/on/public 为公共网关，false/0/no/off/bds 为 BDS
pub fn parse_public_gateway(value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "public" => Ok(true),
        "0" | "false" | "no" | "off" | "bds" => Ok(false),
        other => Err(ConfigError::Invalid(format!(
            "{}: expected boolean, got '{}'",
            ENV_USE_PUBLIC_PPG, other
        ))),
    }
}

/// 配置提供者
pub trait ConfigurationProvider: Send + Sync {
    /// 获取当前配置快照
    fn current_configuration(&self) -> Result<Configuration, ConfigError>;
}

/// 固定配置
#[derive(Debug, Clone)]
pub struct StaticConfigurationProvider {
    configuration: Configuration,
}

impl StaticConfigurationProvider {
    pub fn new(configuration: Configuration) -> Self {
        Self { configuration }
    }
}

impl ConfigurationProvider for StaticConfigurationProvider {
    fn current_configuration(&self) -> Result<Configuration, ConfigError> {
        Ok(self.configuration.clone())
    }
}

/// 每次调用都重新读取环境变量
#[derive(Debug, Clone, Default)]
pub struct EnvConfigurationProvider;

impl ConfigurationProvider for EnvConfigurationProvider {
    fn current_configuration(&self) -> Result<Configuration, ConfigError> {
        let config = Configuration::from_env()?;
        debug!(
            "从环境变量加载配置: url={}, appid={}, type={}",
            config.push_initiator_url,
            config.provider_application_id,
            config.gateway_type()
        );
        Ok(config)
    }
}
