/// TLS 证书校验
///
/// 使用系统根证书做标准 WebPKI 校验，校验失败时交给 `CertificatePolicy` 决定是否继续
use super::traits::{CertificateIssue, CertificatePolicy};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

static NATIVE_ROOTS: OnceLock<Vec<CertificateDer<'static>>> = OnceLock::new();

/// 系统根证书（只加载一次）
pub fn native_root_certs() -> &'static [CertificateDer<'static>] {
    NATIVE_ROOTS.get_or_init(|| {
        let result = rustls_native_certs::load_native_certs();
        for err in &result.errors {
            warn!("加载系统根证书失败: {}", err);
        }
        debug!("已加载系统根证书: {}", result.certs.len());
        result.certs
    })
}

/// 获取加密 provider，已安装全局默认时优先使用
pub fn crypto_provider() -> Arc<CryptoProvider> {
    CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::ring::default_provider()))
}

/// 带证书策略的校验器
pub struct PolicyVerifier {
    /// 没有可用根证书时为 None，此时所有证书都视为颁发者未知
    inner: Option<Arc<WebPkiServerVerifier>>,
    provider: Arc<CryptoProvider>,
    policy: Arc<dyn CertificatePolicy>,
}

impl PolicyVerifier {
    pub fn new(policy: Arc<dyn CertificatePolicy>) -> Self {
        Self::with_roots(native_root_certs(), policy)
    }

    pub fn with_roots(roots: &[CertificateDer<'static>], policy: Arc<dyn CertificatePolicy>) -> Self {
        let provider = crypto_provider();

        let mut store = RootCertStore::empty();
        let (added, ignored) = store.add_parsable_certificates(roots.iter().cloned());
        if ignored > 0 {
            warn!("部分根证书无法解析: added={}, ignored={}", added, ignored);
        }

        let inner = if store.is_empty() {
            warn!("没有可用的根证书，所有服务器证书都将交给证书策略处理");
            None
        } else {
            match WebPkiServerVerifier::builder_with_provider(Arc::new(store), provider.clone())
                .build()
            {
                Ok(verifier) => Some(verifier),
                Err(e) => {
                    warn!("创建 WebPKI 校验器失败: {}", e);
                    None
                }
            }
        };

        Self {
            inner,
            provider,
            policy,
        }
    }
}

impl std::fmt::Debug for PolicyVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyVerifier")
            .field("webpki", &self.inner.is_some())
            .finish()
    }
}

fn host_of(server_name: &ServerName<'_>) -> String {
    match server_name {
        ServerName::DnsName(name) => name.as_ref().to_string(),
        other => format!("{:?}", other),
    }
}

impl ServerCertVerifier for PolicyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let result = match &self.inner {
            Some(verifier) => verifier.verify_server_cert(
                end_entity,
                intermediates,
                server_name,
                ocsp_response,
                now,
            ),
            None => Err(rustls::Error::InvalidCertificate(
                rustls::CertificateError::UnknownIssuer,
            )),
        };

        match result {
            Ok(verified) => Ok(verified),
            Err(err) => {
                let issue = CertificateIssue {
                    host: host_of(server_name),
                    reason: err.to_string(),
                };
                if self.policy.proceed(std::slice::from_ref(&issue)) {
                    warn!("忽略证书错误: host={}, reason={}", issue.host, issue.reason);
                    Ok(ServerCertVerified::assertion())
                } else {
                    debug!("证书错误，中止连接: host={}, reason={}", issue.host, issue.reason);
                    Err(err)
                }
            }
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// 构造使用证书策略的 rustls 客户端配置
pub fn client_config(policy: Arc<dyn CertificatePolicy>) -> Result<rustls::ClientConfig, rustls::Error> {
    let verifier = PolicyVerifier::new(policy);
    let config = rustls::ClientConfig::builder_with_provider(verifier.provider.clone())
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();
    Ok(config)
}
