// ==========================================
// ForgeDB 核心 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、值对象
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod alert;
pub mod operations;
pub mod quote;
pub mod types;

// 重导出核心类型
pub use alert::{
    Alert, AlertRecord, AlertReference, AlertStats, EscalationRecord, NewAlert, RawAlert,
    UpsertOutcome,
};
pub use operations::{StockRecord, Technician, WorkOrder};
pub use quote::{
    round_money, BusinessRuleReport, DiscountResult, ItemTotals, MaterialLine, QuoteDraft,
    QuoteError, QuoteItem, QuoteModifiers, QuoteResult, QuoteTotals, SurchargeResult, TaxResult,
};
pub use types::{AlertCategory, AlertStatus, Severity, StoredAlertType, WorkOrderStatus};
