/// 服务器配置 - 边缘节点的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/antrian | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | PAYMENT_BASE_URL | (空 = mock) | 支付网关地址 |
/// | PAYMENT_SERVER_KEY | (空) | 支付网关服务端密钥 |
/// | PAYMENT_TIMEOUT_MS | 10000 | 网关请求超时(毫秒) |
/// | EVENT_RING_CAPACITY | 1024 | 事件重放缓冲区容量 |
/// | LIVE_CHANNEL_CAPACITY | 256 | 每个订阅者的直播积压上限 |
/// | BOARD_DONE_WINDOW_MS | 28800000 | 队列看板展示已完成订单的窗口 (默认 8 小时) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/antrian HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,

    // === 支付网关 ===
    /// 支付网关地址；为空时使用 mock 网关 (开发/测试)
    pub payment_base_url: String,
    /// 支付网关服务端密钥
    pub payment_server_key: String,
    /// 网关请求超时 (毫秒)
    pub payment_timeout_ms: u64,

    // === 事件广播 ===
    /// 事件重放缓冲区容量
    pub event_ring_capacity: usize,
    /// 每个订阅者的直播积压上限
    pub live_channel_capacity: usize,

    // === 看板 ===
    /// 已完成订单在看板上保留的窗口 (毫秒)
    pub board_done_window_ms: i64,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/antrian".into()),
            http_port: env_parse("HTTP_PORT", 3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),

            payment_base_url: std::env::var("PAYMENT_BASE_URL").unwrap_or_default(),
            payment_server_key: std::env::var("PAYMENT_SERVER_KEY").unwrap_or_default(),
            payment_timeout_ms: env_parse("PAYMENT_TIMEOUT_MS", 10_000),

            event_ring_capacity: env_parse("EVENT_RING_CAPACITY", 1024),
            live_channel_capacity: env_parse("LIVE_CHANNEL_CAPACITY", 256),

            // 8 小时，与原看板展示窗口一致
            board_done_window_ms: env_parse("BOARD_DONE_WINDOW_MS", 8 * 60 * 60 * 1000),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
