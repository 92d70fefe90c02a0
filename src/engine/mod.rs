// ==========================================
// ForgeDB 核心 - 引擎层
// ==========================================
// 职责: 报价计算 / 服务告警检测与升级
// 红线: Engine 不拼 SQL，数据访问一律经由 Repository trait
// ==========================================

pub mod alert_detectors;
pub mod escalation;
pub mod quote_calculation;
pub mod service_alert;

// 重导出核心引擎
pub use alert_detectors::Detector;
pub use escalation::{next_severity, EscalationStep};
pub use quote_calculation::QuoteCalculationEngine;
pub use service_alert::{sort_alerts, ServiceAlertEngine};
