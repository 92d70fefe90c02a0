// ==========================================
// ForgeDB 核心 - API 层
// ==========================================
// 职责: 报价预览与服务告警的门面接口，供监听进程与上层服务调用
// ==========================================

pub mod alert_api;
pub mod error;
pub mod quote_api;

// 重导出核心类型
pub use alert_api::{AlertApi, AlertDigest, AlertsResponse};
pub use error::{ApiError, ApiResult};
pub use quote_api::{QuoteApi, QuotePreview};
