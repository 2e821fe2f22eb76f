/// 注册结果解析
///
/// 响应码表以数据形式维护，分类是纯函数，持久化由调用方根据分类结果执行
use super::traits::Completion;

/// 成功响应
pub const SUCCESS_TOKEN: &str = "rc=200";

/// 成功码
pub const SUCCESS_CODE: i32 = 200;

/// 未知响应码时使用的哨兵值
pub const UNKNOWN_CODE: i32 = -1;

/// 响应码表项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseEntry {
    pub token: &'static str,
    pub code: i32,
    pub description: &'static str,
}

/// 服务器返回的业务错误码
pub const RESPONSE_TABLE: &[ResponseEntry] = &[
    ResponseEntry {
        token: "rc=10001",
        code: 10001,
        description: "Error: The token from the create channel was null, empty, or longer than 40 characters in length.",
    },
    ResponseEntry {
        token: "rc=10011",
        code: 10011,
        description: "Error: The OS version or device model of the BlackBerry was invalid.",
    },
    ResponseEntry {
        token: "rc=10002",
        code: 10002,
        description: "Error: The application ID specified in the configuration settings could not be found, or it was found to be inactive or expired.",
    },
    ResponseEntry {
        token: "rc=10020",
        code: 10020,
        description: "Error: The subscriber ID generated by the Push Initiator (based on the username and password specified) was null or empty, longer than 42 characters in length, or matched the 'push_all' keyword.",
    },
    ResponseEntry {
        token: "rc=10025",
        code: 10025,
        description: "Error: The Push Initiator application has the bypass subscription flag set to true (so no subscribe is allowed).",
    },
    ResponseEntry {
        token: "rc=10026",
        code: 10026,
        description: "Error: The username or password specified was incorrect.",
    },
    ResponseEntry {
        token: "rc=10027",
        code: 10027,
        description: "Error: A CPSubscriptionFailureException was thrown by the onSubscribeSuccess method of the implementation being used of the ContentProviderSubscriptionService interface.",
    },
    ResponseEntry {
        token: "rc=10028",
        code: 10028,
        description: "Error: The type specified was null, empty, or not one of 'public' or 'bds', or invalid for the push application type.",
    },
    ResponseEntry {
        token: "rc=-9999",
        code: -9999,
        description: "Error: General error (i.e. rc=-9999).",
    },
];

/// 响应分类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseKind {
    /// rc=200
    Success,

    /// 表中的业务错误
    Rejected(ResponseEntry),

    /// 不认识的响应，保留原文
    Unknown(String),
}

impl ResponseKind {
    /// 只有成功时才需要保存用户
    pub fn should_persist(&self) -> bool {
        matches!(self, ResponseKind::Success)
    }

    pub fn into_outcome(self) -> RegistrationOutcome {
        match self {
            ResponseKind::Success => RegistrationOutcome::new(SUCCESS_CODE, String::new()),
            ResponseKind::Rejected(entry) => {
                RegistrationOutcome::new(entry.code, entry.description.to_string())
            }
            ResponseKind::Unknown(token) => RegistrationOutcome::new(
                UNKNOWN_CODE,
                format!("Error: Unknown error code: {}.", token),
            ),
        }
    }
}

/// 按精确字符串匹配对响应体分类
pub fn classify(token: &str) -> ResponseKind {
    if token == SUCCESS_TOKEN {
        return ResponseKind::Success;
    }

    RESPONSE_TABLE
        .iter()
        .find(|entry| entry.token == token)
        .map(|entry| ResponseKind::Rejected(*entry))
        .unwrap_or_else(|| ResponseKind::Unknown(token.to_string()))
}

/// 一次注册的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOutcome {
    code: i32,
    description: String,
}

impl RegistrationOutcome {
    pub fn new(code: i32, description: String) -> Self {
        Self { code, description }
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    /// 成功时为空
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

impl std::fmt::Display for RegistrationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} {}", self.code, self.description)
        }
    }
}

/// 完成事件的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    pub outcome: RegistrationOutcome,
    pub persist_user: bool,
}

/// 将传输层完成事件转换为注册结果
pub fn interpret(completion: Completion) -> Interpretation {
    match completion {
        Completion::Success(body) => {
            let token = String::from_utf8_lossy(&body);
            let kind = classify(&token);
            Interpretation {
                persist_user: kind.should_persist(),
                outcome: kind.into_outcome(),
            }
        }
        Completion::Failure { code, message } => Interpretation {
            outcome: RegistrationOutcome::new(code, message),
            persist_user: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_token() {
        let interpretation = interpret(Completion::success("rc=200"));
        assert!(interpretation.persist_user);
        assert_eq!(interpretation.outcome.code(), 200);
        assert_eq!(interpretation.outcome.description(), "");
        assert!(interpretation.outcome.is_success());
    }

    #[test]
    fn test_every_table_entry() {
        let expected = [
            ("rc=10001", 10001, "Error: The token from the create channel was null, empty, or longer than 40 characters in length."),
            ("rc=10011", 10011, "Error: The OS version or device model of the BlackBerry was invalid."),
            ("rc=10002", 10002, "Error: The application ID specified in the configuration settings could not be found, or it was found to be inactive or expired."),
            ("rc=10020", 10020, "Error: The subscriber ID generated by the Push Initiator (based on the username and password specified) was null or empty, longer than 42 characters in length, or matched the 'push_all' keyword."),
            ("rc=10025", 10025, "Error: The Push Initiator application has the bypass subscription flag set to true (so no subscribe is allowed)."),
            ("rc=10026", 10026, "Error: The username or password specified was incorrect."),
            ("rc=10027", 10027, "Error: A CPSubscriptionFailureException was thrown by the onSubscribeSuccess method of the implementation being used of the ContentProviderSubscriptionService interface."),
            ("rc=10028", 10028, "Error: The type specified was null, empty, or not one of 'public' or 'bds', or invalid for the push application type."),
            ("rc=-9999", -9999, "Error: General error (i.e. rc=-9999)."),
        ];

        for (token, code, description) in expected {
            let interpretation = interpret(Completion::success(token));
            assert_eq!(interpretation.outcome.code(), code, "{}", token);
            assert_eq!(interpretation.outcome.description(), description, "{}", token);
            assert!(!interpretation.persist_user, "{}", token);
        }
    }

    #[test]
    fn test_unknown_tokens_echo_raw_value() {
        for token in ["rc=42", "", "garbage", "rc=200\n", "RC=200", " rc=200"] {
            let interpretation = interpret(Completion::success(token));
            assert_eq!(interpretation.outcome.code(), UNKNOWN_CODE);
            assert!(interpretation.outcome.description().contains(token));
            assert_eq!(
                interpretation.outcome.description(),
                format!("Error: Unknown error code: {}.", token)
            );
            assert!(!interpretation.persist_user);
        }
    }

    #[test]
    fn test_invalid_utf8_is_unknown() {
        let interpretation = interpret(Completion::Success(vec![0xff, 0xfe]));
        assert_eq!(interpretation.outcome.code(), UNKNOWN_CODE);
        assert!(!interpretation.persist_user);
    }

    #[test]
    fn test_transport_failure_passthrough() {
        let interpretation = interpret(Completion::failure(7, "Connection refused"));
        assert_eq!(
            interpretation.outcome,
            RegistrationOutcome::new(7, "Connection refused".to_string())
        );
        assert!(!interpretation.persist_user);
    }

    #[test]
    fn test_classify_is_pure() {
        assert_eq!(classify("rc=200"), ResponseKind::Success);
        assert!(matches!(classify("rc=10026"), ResponseKind::Rejected(e) if e.code == 10026));
        assert_eq!(classify("rc=1"), ResponseKind::Unknown("rc=1".to_string()));
    }

    #[test]
    fn test_table_tokens_unique() {
        let mut tokens: Vec<&str> = RESPONSE_TABLE.iter().map(|e| e.token).collect();
        tokens.push(SUCCESS_TOKEN);
        let count = tokens.len();
        tokens.sort();
        tokens.dedup();
        assert_eq!(tokens.len(), count);
    }

    #[test]
    fn test_display() {
        assert_eq!(RegistrationOutcome::new(200, String::new()).to_string(), "200");
        assert_eq!(
            RegistrationOutcome::new(7, "Connection refused".into()).to_string(),
            "7 Connection refused"
        );
    }
}
