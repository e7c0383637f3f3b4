use thiserror::Error;

/// Startup / infrastructure errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Storage initialization failed: {0}")]
    Storage(#[from] crate::orders::StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// 服务器层的 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
