//! 日志初始化
//!
//! 控制台输出为主；设置 LOG_DIR 后追加按天滚动的文件输出。
//! 过滤串支持 tracing 指令语法，如 `info,antrian_server=debug`。

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// 以默认过滤级别初始化（仅控制台）
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// 初始化日志，可选文件输出
///
/// `filter` 为空时用 `info`；`log_dir` 不存在时静默回退到仅控制台。
pub fn init_logger_with_file(filter: Option<&str>, log_dir: Option<&str>) {
    let filter = EnvFilter::try_new(filter.unwrap_or("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_dir.map(Path::new).filter(|dir| dir.is_dir()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "antrian-server.log");
            builder.with_writer(appender).with_ansi(false).init();
        }
        None => builder.init(),
    }
}
