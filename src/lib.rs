// 声明所有模块
pub mod config;
pub mod device;
pub mod error;
pub mod registration;
pub mod user;
pub mod utils;

/// 重新导出thiserror错误类型
pub use crate::error::{ConfigError, DeviceError, RegisterError, StoreError};

/// 主要API重新导出，简化使用
pub use crate::config::{
    Configuration, ConfigurationProvider, EnvConfigurationProvider, StaticConfigurationProvider,
};
pub use crate::device::{
    DeviceInfo, DevicePlatform, HostPlatform, OverrideDeviceInfo, PlatformDeviceInfo,
    StaticDeviceInfo,
};
pub use crate::registration::{
    CertificatePolicy, HttpTransport, HttpTransportConfig, IgnoreCertificateErrors,
    PendingRegistration, RegisterService, RegistrationOutcome, RejectCertificateErrors,
};
pub use crate::user::{FileUserStore, MemoryUserStore, User, UserStore};

use std::sync::Arc;

/// 库的版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 便捷函数：使用默认 HTTPS 传输层、宿主机设备信息创建注册服务
///
/// 证书错误一律忽略
pub fn create_register_service(
    configuration: Arc<dyn ConfigurationProvider>,
    store: Arc<dyn UserStore>,
) -> Result<RegisterService, RegisterError> {
    create_register_service_with_policy(configuration, store, Arc::new(IgnoreCertificateErrors))
}

/// 便捷函数：指定证书策略创建注册服务
pub fn create_register_service_with_policy(
    configuration: Arc<dyn ConfigurationProvider>,
    store: Arc<dyn UserStore>,
    policy: Arc<dyn CertificatePolicy>,
) -> Result<RegisterService, RegisterError> {
    let transport = HttpTransport::new(HttpTransportConfig::default(), policy)?;
    let device = PlatformDeviceInfo::new(HostPlatform::default());

    Ok(RegisterService::new(
        Arc::new(transport),
        configuration,
        Arc::new(device),
        store,
    ))
}
