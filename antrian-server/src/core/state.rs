//! 服务器状态 - 持有所有服务的单例引用

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{Config, Result};
use crate::orders::{EventBroadcaster, LifecycleController, OrderStore, QueueSequencer};
use crate::payment::{MockGateway, PaymentGateway, SnapGateway};

/// 服务器状态 - 边缘节点的核心数据结构
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | store | 订单存储 (redb) |
/// | lifecycle | 生命周期控制器 (唯一状态写入方) |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 订单存储
    pub store: OrderStore,
    /// 生命周期控制器
    pub lifecycle: Arc<LifecycleController>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 创建工作目录、打开数据库并装配各组件。
    /// `PAYMENT_BASE_URL` 为空时使用 mock 网关。
    pub fn initialize(config: &Config) -> Result<Self> {
        let work_dir = Path::new(&config.work_dir);
        std::fs::create_dir_all(work_dir)?;

        let store = OrderStore::open(work_dir.join("orders.redb"))?;
        let sequencer = QueueSequencer::new(store.clone());
        let broadcaster =
            EventBroadcaster::new(config.event_ring_capacity, config.live_channel_capacity);

        let gateway: Arc<dyn PaymentGateway> = if config.payment_base_url.is_empty() {
            tracing::warn!("PAYMENT_BASE_URL not set, using mock payment gateway");
            Arc::new(MockGateway)
        } else {
            Arc::new(SnapGateway::new(
                config.payment_base_url.clone(),
                config.payment_server_key.clone(),
                Duration::from_millis(config.payment_timeout_ms),
            ))
        };

        let lifecycle = Arc::new(LifecycleController::new(
            store.clone(),
            sequencer,
            broadcaster,
            gateway,
        ));

        Ok(Self {
            config: config.clone(),
            store,
            lifecycle,
        })
    }

    /// 获取事件广播器
    pub fn broadcaster(&self) -> &EventBroadcaster {
        self.lifecycle.broadcaster()
    }
}
