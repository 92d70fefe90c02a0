// ==========================================
// ForgeDB 核心 - 核心库
// ==========================================
// 职责: 报价计算引擎 + 服务告警引擎
// 技术栈: Rust + SQLite (rusqlite) + rust_decimal
// ==========================================

// 初始化国际化系统（产品语言: 西班牙语）
rust_i18n::i18n!("locales", fallback = "es");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 报价计算 / 告警检测与升级
pub mod engine;

// 配置层 - 告警阈值 / 报价默认值
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 门面接口
pub mod api;

// 应用层 - 状态组装 / 告警轮询
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AlertCategory, AlertStatus, Severity, StoredAlertType, WorkOrderStatus};

// 领域实体
pub use domain::{Alert, AlertRecord, AlertStats, EscalationRecord, QuoteItem, QuoteTotals, RawAlert};

// 引擎
pub use engine::{QuoteCalculationEngine, ServiceAlertEngine};

// 配置
pub use config::{ConfigManager, ThresholdConfig};

// API
pub use api::{AlertApi, ApiError, ApiResult, QuoteApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "ForgeDB Core";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
