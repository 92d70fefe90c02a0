// ==========================================
// ForgeDB 核心 - 日志初始化
// ==========================================
// 输出: stderr（stdout 保留给监听事件的 JSON 行）
// 过滤: RUST_LOG，未设置时使用 DEFAULT_DIRECTIVES
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 默认过滤: 本 crate info，依赖库只保留 warn 以上
pub const DEFAULT_DIRECTIVES: &str = "info,rusqlite=warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// 初始化日志
///
/// # 环境变量
/// - RUST_LOG: 例如 `RUST_LOG=forge_core::engine=debug`
pub fn init() {
    let installed = fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .try_init();

    if installed.is_err() {
        tracing::debug!("日志订阅器已存在，跳过初始化");
    }
}

/// 测试用：debug 级别，写入测试输出，可重复调用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
