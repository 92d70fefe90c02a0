// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, Utc};
use forge_core::domain::operations::{StockRecord, Technician, WorkOrder};
use forge_core::domain::types::WorkOrderStatus;

// ==========================================
// WorkOrder 构建器
// ==========================================

pub struct WorkOrderBuilder {
    inner: WorkOrder,
}

impl WorkOrderBuilder {
    pub fn new(id: i64, status: WorkOrderStatus) -> Self {
        let mut inner = WorkOrder::new(id, status);
        inner.wo_number = Some(format!("WO-{}", id));
        Self { inner }
    }

    pub fn in_progress(id: i64) -> Self {
        Self::new(id, WorkOrderStatus::InProgress)
    }

    pub fn scheduled(id: i64) -> Self {
        Self::new(id, WorkOrderStatus::Scheduled)
    }

    pub fn completed(id: i64, on: NaiveDate) -> Self {
        let mut builder = Self::new(id, WorkOrderStatus::Completed);
        builder.inner.completed_date = Some(on);
        builder
    }

    pub fn technician(mut self, technician_id: i64) -> Self {
        self.inner.primary_technician_id = Some(technician_id);
        self
    }

    /// 预计完成时间 = at - hours（即在 at 时刻已延误 hours 小时）
    pub fn delayed_by(mut self, at: DateTime<Utc>, hours: i64) -> Self {
        self.inner.estimated_completion_date = Some(at - Duration::hours(hours));
        self
    }

    pub fn estimated_hours(mut self, hours: f64) -> Self {
        self.inner.estimated_hours = Some(hours);
        self
    }

    pub fn actual_hours(mut self, hours: f64) -> Self {
        self.inner.actual_hours = Some(hours);
        self
    }

    pub fn build(self) -> WorkOrder {
        self.inner
    }
}

// ==========================================
// StockRecord / Technician
// ==========================================

pub fn stock(code: &str, quantity: f64, min_quantity: f64) -> StockRecord {
    StockRecord {
        product_code: Some(code.to_string()),
        product_name: Some(format!("Producto {}", code)),
        warehouse_name: Some("Central".to_string()),
        quantity: Some(quantity),
        min_quantity: Some(min_quantity),
    }
}

pub fn technician(id: i64, name: &str) -> Technician {
    Technician {
        id,
        name: Some(name.to_string()),
        is_active: true,
    }
}
