//! 统一错误处理
//!
//! 提供应用级错误类型和响应结构：
//! - [`AppError`] - 应用错误枚举
//! - [`AppResponse`] - API 响应结构
//!
//! # 错误分类
//!
//! | 分类 | HTTP | 说明 |
//! |------|------|------|
//! | Validation | 400 | 输入错误，未发生任何状态变更 |
//! | NotFound | 404 | 资源不存在 |
//! | Conflict | 409 | 并发冲突 (stale state / not active)，可安全重试 |
//! | Gateway | 502 | 支付网关不可达，订单保持待支付 |
//! | Database / Internal | 500 | 系统错误 |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::orders::lifecycle::LifecycleError;
use crate::orders::sequencer::SequencerError;
use crate::orders::store::StoreError;
use crate::payment::GatewayError;

/// API 统一响应结构
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    /// 错误类型 ("ok" 表示成功)
    pub error: String,
    /// 消息
    pub message: String,
    /// 响应数据
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Expected under concurrency - never logged as fatal
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::Conflict(msg) => {
                // 并发冲突是预期行为，debug 级别即可
                tracing::debug!(error = %msg, "Conflict surfaced to caller");
                (StatusCode::CONFLICT, "conflict", msg.clone())
            }
            AppError::Gateway(msg) => {
                tracing::warn!(error = %msg, "Payment gateway unreachable");
                (
                    StatusCode::BAD_GATEWAY,
                    "gateway_error",
                    "Payment provider unavailable, order left awaiting payment".to_string(),
                )
            }
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(AppResponse::<()> {
            error: error_type.to_string(),
            message,
            data: None,
        });

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => AppError::NotFound(format!("Order {} not found", id)),
            StoreError::EmptyOrder => AppError::Validation("Order has no items".to_string()),
            StoreError::InvalidProduct(id) => {
                AppError::Validation(format!("Unknown or inactive product: {}", id))
            }
            StoreError::InvalidQuantity {
                product_id,
                quantity,
            } => AppError::Validation(format!(
                "Invalid quantity {} for product {}",
                quantity, product_id
            )),
            StoreError::StaleState(order) => AppError::Conflict(format!(
                "Order {} already moved to {}",
                order.order_id, order.queue_state
            )),
            StoreError::SlotOccupied(occupant) => AppError::Conflict(format!(
                "Preparation slot occupied by order {}",
                occupant.order_id
            )),
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<SequencerError> for AppError {
    fn from(e: SequencerError) -> Self {
        match e {
            SequencerError::AlreadyAdmitted(id) => {
                AppError::Conflict(format!("Order {} already admitted", id))
            }
            SequencerError::NotActive(id) => {
                AppError::Conflict(format!("Order {} is not the active order", id))
            }
            SequencerError::Store(e) => e.into(),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::InvalidAmount(total) => {
                AppError::Validation(format!("Invalid payment amount: {}", total))
            }
            GatewayError::Unavailable(msg) => AppError::Gateway(msg),
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::Store(e) => e.into(),
            LifecycleError::Sequencer(e) => e.into(),
            LifecycleError::Gateway(e) => e.into(),
        }
    }
}

// ========== Helper functions ==========

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse {
        error: "ok".to_string(),
        message: "Success".to_string(),
        data: Some(data),
    })
}
