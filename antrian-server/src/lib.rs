//! Antrian Edge Server - 快餐排队点单系统服务端
//!
//! # 架构概述
//!
//! 本模块是排队点单服务端的主入口，提供以下核心功能：
//!
//! - **订单引擎** (`orders`): 支付门控的订单状态机、队列排序、事件广播
//! - **支付网关** (`payment`): 支付发起与异步回调对账
//! - **HTTP API** (`api`): RESTful API 接口 + WebSocket 直播订阅
//!
//! # 模块结构
//!
//! ```text
//! antrian-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── orders/        # 订单存储、队列排序、生命周期、事件广播
//! ├── payment/       # 支付网关适配
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 错误、日志、校验
//! ```

pub mod api;
pub mod core;
pub mod orders;
pub mod payment;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerState};
pub use orders::{EventBroadcaster, LifecycleController, OrderStore, QueueSequencer};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置环境: dotenv + 日志
pub fn setup_environment() {
    dotenv::dotenv().ok();
    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());
}

pub fn print_banner() {
    println!(
        r#"
    ___          __       _
   /   |  ____  / /______(_)___ _____
  / /| | / __ \/ __/ ___/ / __ `/ __ \
 / ___ |/ / / / /_/ /  / / /_/ / / / /
/_/  |_/_/ /_/\__/_/  /_/\__,_/_/ /_/
    "#
    );
}
