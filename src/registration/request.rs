/// 注册请求构造
///
/// 不做任何校验：非法的基础地址会在传输阶段以失败形式暴露
use crate::config::Configuration;
use crate::user::User;
use url::Url;

/// 订阅路径
pub const SUBSCRIBE_PATH: &str = "/subscribe";

/// 注册请求描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    target: String,
    query: Vec<(&'static str, String)>,
}

impl RegistrationRequest {
    /// 构造订阅请求
    ///
    /// 参数顺序: appid, address, osversion, model, username, password, type
    pub fn build(
        user: &User,
        token: &str,
        config: &Configuration,
        os_version: &str,
        model: &str,
    ) -> Self {
        let query = vec![
            ("appid", config.provider_application_id.clone()),
            ("address", token.to_string()),
            ("osversion", os_version.to_string()),
            ("model", model.to_string()),
            ("username", user.user_id.clone()),
            ("password", user.password.clone()),
            ("type", config.gateway_type().to_string()),
        ];

        Self {
            target: format!("{}{}", config.push_initiator_url, SUBSCRIBE_PATH),
            query,
        }
    }

    /// 请求目标（不含查询参数）
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn query(&self) -> &[(&'static str, String)] {
        &self.query
    }

    /// 获取参数值
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 生成完整 URL，参数按 URL 规则编码
    pub fn url(&self) -> Result<Url, url::ParseError> {
        Url::parse_with_params(&self.target, &self.query)
    }

    /// 用于日志的 URL，密码被替换
    pub fn redacted(&self) -> String {
        let masked = self.query.iter().map(|(k, v)| {
            if *k == "password" {
                (*k, "***")
            } else {
                (*k, v.as_str())
            }
        });

        match Url::parse_with_params(&self.target, masked) {
            Ok(url) => url.to_string(),
            Err(_) => self.target.clone(),
        }
    }
}
