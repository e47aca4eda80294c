// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 级别由 RUST_LOG 控制，未设置时回退到 info
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

fn env_filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
///   例如: RUST_LOG=item_import=debug
///
/// # 示例
/// ```no_run
/// use item_import::logging;
/// logging::init();
/// ```
///
/// 重复调用不会 panic（已有全局 subscriber 时静默跳过）
pub fn init() {
    let _ = fmt()
        .with_env_filter(env_filter_or(DEFAULT_FILTER))
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .try_init();
}

/// 测试环境日志（输出交给 cargo test 捕获）
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(env_filter_or("debug"))
        .with_test_writer()
        .try_init();
}
