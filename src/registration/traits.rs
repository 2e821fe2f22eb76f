/// Registration traits 定义
///
/// 传输层与证书策略的抽象，核心逻辑只依赖这些接口
use super::request::RegistrationRequest;
use async_trait::async_trait;

/// 传输层完成事件
///
/// 每个请求只产生一次
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// 请求成功，携带响应体
    Success(Vec<u8>),

    /// 传输失败（连接、DNS、超时、HTTP 错误状态等）
    Failure { code: i32, message: String },
}

impl Completion {
    pub fn success(body: impl Into<Vec<u8>>) -> Self {
        Completion::Success(body.into())
    }

    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        Completion::Failure {
            code,
            message: message.into(),
        }
    }
}

/// 传输层 trait
///
/// 实现者负责发起 GET、处理 TLS，并在返回前释放响应资源
#[async_trait]
pub trait Transport: Send + Sync {
    /// 执行注册请求，返回唯一的完成事件
    async fn get(&self, request: &RegistrationRequest) -> Completion;
}

/// 证书校验错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateIssue {
    /// 服务器名称
    pub host: String,

    /// 校验失败原因
    pub reason: String,
}

/// 证书错误策略
///
/// 返回 true 表示忽略这些错误继续连接
pub trait CertificatePolicy: Send + Sync {
    fn proceed(&self, issues: &[CertificateIssue]) -> bool;
}

/// 忽略所有证书错误
///
/// Push Initiator 的证书链不被系统默认信任库完整信任，
/// 对所有主机、所有错误类型一律继续连接
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreCertificateErrors;

impl CertificatePolicy for IgnoreCertificateErrors {
    fn proceed(&self, _issues: &[CertificateIssue]) -> bool {
        true
    }
}

/// 严格模式：任何证书错误都中止连接
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectCertificateErrors;

impl CertificatePolicy for RejectCertificateErrors {
    fn proceed(&self, _issues: &[CertificateIssue]) -> bool {
        false
    }
}
