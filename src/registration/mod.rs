/// Registration 模块
///
/// 向 Push Initiator 订阅推送：构造请求、发送、解析响应码
///
/// ## 结构
///
/// - `RegistrationRequest`: 构造 `/subscribe` 请求及 7 个查询参数
/// - `interpret` / `classify`: 将完成事件映射为 `RegistrationOutcome`
/// - `Transport` trait: 传输层接口，`HttpTransport` 为 reqwest 实现
/// - `CertificatePolicy` trait: 证书错误策略，默认 `IgnoreCertificateErrors`
/// - `RegisterService`: 单飞注册服务，成功时保存用户
///
/// ## 使用示例
///
/// ```rust,no_run
/// use push_registrar::registration::*;
/// use push_registrar::{Configuration, StaticConfigurationProvider, MemoryUserStore, StaticDeviceInfo, User};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = HttpTransport::new(
///     HttpTransportConfig::default(),
///     Arc::new(IgnoreCertificateErrors),
/// )?;
/// let service = RegisterService::new(
///     Arc::new(transport),
///     Arc::new(StaticConfigurationProvider::new(Configuration::new(
///         "https://pi.example", "app1", true,
///     ))),
///     Arc::new(StaticDeviceInfo::new("10.3", "Z10")),
///     Arc::new(MemoryUserStore::new()),
/// );
///
/// let outcome = service
///     .subscribe(&User::new("alice", "secret"), "tok123")?
///     .outcome()
///     .await?;
/// println!("{} {}", outcome.code(), outcome.description());
/// # Ok(())
/// # }
/// ```

mod outcome;
mod request;
mod service;
mod tls;
mod traits;
mod transport;

// 导出公共接口
pub use outcome::{
    classify, interpret, Interpretation, RegistrationOutcome, ResponseEntry, ResponseKind,
    RESPONSE_TABLE, SUCCESS_CODE, SUCCESS_TOKEN, UNKNOWN_CODE,
};
pub use request::{RegistrationRequest, SUBSCRIBE_PATH};
pub use service::{CompletionListener, PendingRegistration, RegisterService};
pub use tls::{client_config, PolicyVerifier};
pub use traits::{
    CertificateIssue, CertificatePolicy, Completion, IgnoreCertificateErrors,
    RejectCertificateErrors, Transport,
};
pub use transport::{HttpTransport, HttpTransportConfig, TransportErrorKind};
