/// 基于 reqwest 的 HTTPS 传输层
///
/// 负责 URL 生成、超时、错误码映射；证书错误按 `CertificatePolicy` 处理
use super::request::RegistrationRequest;
use super::tls;
use super::traits::{CertificatePolicy, Completion, Transport};
use crate::error::RegisterError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_USER_AGENT: &str = concat!("push-registrar/", env!("CARGO_PKG_VERSION"));

/// 传输层错误分类，数值沿用客户端网络层的错误编号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    ConnectionRefused,
    RemoteHostClosed,
    HostNotFound,
    Timeout,
    TlsHandshakeFailed,
    UnknownNetwork,
    ContentAccessDenied,
    ContentNotFound,
    AuthenticationRequired,
    UnknownContent,
    ProtocolUnknown,
    InternalServerError,
    OperationNotImplemented,
    ServiceUnavailable,
    UnknownServerError,
}

impl TransportErrorKind {
    pub fn code(&self) -> i32 {
        match self {
            TransportErrorKind::ConnectionRefused => 1,
            TransportErrorKind::RemoteHostClosed => 2,
            TransportErrorKind::HostNotFound => 3,
            TransportErrorKind::Timeout => 4,
            TransportErrorKind::TlsHandshakeFailed => 6,
            TransportErrorKind::UnknownNetwork => 99,
            TransportErrorKind::ContentAccessDenied => 201,
            TransportErrorKind::ContentNotFound => 203,
            TransportErrorKind::AuthenticationRequired => 204,
            TransportErrorKind::UnknownContent => 299,
            TransportErrorKind::ProtocolUnknown => 301,
            TransportErrorKind::InternalServerError => 401,
            TransportErrorKind::OperationNotImplemented => 402,
            TransportErrorKind::ServiceUnavailable => 403,
            TransportErrorKind::UnknownServerError => 499,
        }
    }

    /// HTTP 错误状态映射
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::PROXY_AUTHENTICATION_REQUIRED => {
                TransportErrorKind::AuthenticationRequired
            }
            StatusCode::FORBIDDEN => TransportErrorKind::ContentAccessDenied,
            StatusCode::NOT_FOUND => TransportErrorKind::ContentNotFound,
            StatusCode::INTERNAL_SERVER_ERROR => TransportErrorKind::InternalServerError,
            StatusCode::NOT_IMPLEMENTED => TransportErrorKind::OperationNotImplemented,
            StatusCode::SERVICE_UNAVAILABLE => TransportErrorKind::ServiceUnavailable,
            s if s.is_server_error() => TransportErrorKind::UnknownServerError,
            _ => TransportErrorKind::UnknownContent,
        }
    }

    pub fn completion(self, message: impl Into<String>) -> Completion {
        Completion::failure(self.code(), message)
    }
}

/// 传输层配置
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// 请求超时
    pub timeout: Duration,

    /// User-Agent
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpTransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTPS 传输层
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// 创建传输层
    ///
    /// # 参数
    /// - `config`: 超时与 User-Agent
    /// - `policy`: 证书错误策略
    pub fn new(
        config: HttpTransportConfig,
        policy: Arc<dyn CertificatePolicy>,
    ) -> Result<Self, RegisterError> {
        let tls_config = tls::client_config(policy)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .use_preconfigured_tls(tls_config)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &RegistrationRequest) -> Completion {
        let url = match request.url() {
            Ok(url) => url,
            Err(e) => {
                warn!("无效的请求地址 {}: {}", request.target(), e);
                return TransportErrorKind::ProtocolUnknown
                    .completion(format!("Protocol \"\" is unknown: {}", e));
            }
        };

        debug!("GET {}", request.redacted());

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return map_reqwest_error(e),
        };

        let status = response.status();
        if !status.is_success() {
            info!("服务器返回错误状态: {}", status);
            return TransportErrorKind::from_status(status).completion(format!(
                "Error transferring {} - server replied: {}",
                request.target(),
                status.canonical_reason().unwrap_or(status.as_str())
            ));
        }

        match response.bytes().await {
            Ok(body) => Completion::Success(body.to_vec()),
            Err(e) => map_reqwest_error(e),
        }
    }
}

fn io_error_kind(err: &(dyn std::error::Error + 'static)) -> Option<std::io::ErrorKind> {
    let mut source = Some(err);
    while let Some(current) = source {
        if let Some(io) = current.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        source = current.source();
    }
    None
}

fn chain_contains(err: &(dyn std::error::Error + 'static), needle: &str) -> bool {
    let mut source = Some(err);
    while let Some(current) = source {
        if current.to_string().to_ascii_lowercase().contains(needle) {
            return true;
        }
        source = current.source();
    }
    false
}

/// reqwest 的错误信息包含完整 URL（含密码参数），格式化前先去掉
fn map_reqwest_error(err: reqwest::Error) -> Completion {
    let err = err.without_url();
    let kind = classify_reqwest_error(&err);
    debug!("传输失败 ({:?}): {:?}", kind, err);

    let message = match kind {
        TransportErrorKind::ConnectionRefused => "Connection refused".to_string(),
        TransportErrorKind::RemoteHostClosed => "Connection closed".to_string(),
        TransportErrorKind::Timeout => "Operation timed out".to_string(),
        _ => error_chain(&err),
    };
    kind.completion(message)
}

/// 拼接错误链，例如 "error sending request: client error (Connect): dns error: ..."
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(current) = source {
        message.push_str(": ");
        message.push_str(&current.to_string());
        source = current.source();
    }
    message
}

fn classify_reqwest_error(err: &reqwest::Error) -> TransportErrorKind {
    if err.is_timeout() {
        return TransportErrorKind::Timeout;
    }

    match io_error_kind(err) {
        Some(std::io::ErrorKind::ConnectionRefused) => return TransportErrorKind::ConnectionRefused,
        Some(std::io::ErrorKind::ConnectionReset)
        | Some(std::io::ErrorKind::ConnectionAborted)
        | Some(std::io::ErrorKind::UnexpectedEof) => return TransportErrorKind::RemoteHostClosed,
        Some(std::io::ErrorKind::TimedOut) => return TransportErrorKind::Timeout,
        _ => {}
    }

    if chain_contains(err, "dns error") || chain_contains(err, "failed to lookup address") {
        TransportErrorKind::HostNotFound
    } else if chain_contains(err, "certificate") || chain_contains(err, "tls") {
        TransportErrorKind::TlsHandshakeFailed
    } else if err.is_builder() {
        TransportErrorKind::ProtocolUnknown
    } else {
        TransportErrorKind::UnknownNetwork
    }
}
