/// 工具函数模块
///
/// 日志初始化与注册请求 ID 生成
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则使用传入的日志级别
///
/// # 示例
/// ```rust,no_run
/// use push_registrar::utils::initialize_logging;
///
/// initialize_logging("debug");
/// ```
pub fn initialize_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // 重复初始化时忽略错误（例如测试中多次调用）
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 生成注册请求 ID
///
/// 使用 UUID v4，日志中用于关联同一次注册的多条记录
///
/// # 示例
/// ```rust
/// let id = push_registrar::utils::make_attempt_id();
/// assert_eq!(id.len(), 36);
/// ```
pub fn make_attempt_id() -> String {
    Uuid::new_v4().to_string()
}
