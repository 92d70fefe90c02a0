// ==========================================
// ForgeDB 核心 - 运营数据领域模型
// ==========================================
// 用途: 告警检测的只读输入 (工单 / 库存 / 技术员)
// 约定: 可选字段缺失 = 该检测项不可用，不视为错误
// ==========================================

use crate::domain::types::WorkOrderStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// WorkOrder - 工单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: i64,
    pub wo_number: Option<String>,
    pub status: WorkOrderStatus,
    pub primary_technician_id: Option<i64>,
    pub estimated_completion_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub completed_date: Option<NaiveDate>,
}

impl WorkOrder {
    pub fn new(id: i64, status: WorkOrderStatus) -> Self {
        Self {
            id,
            wo_number: None,
            status,
            primary_technician_id: None,
            estimated_completion_date: None,
            estimated_hours: None,
            actual_hours: None,
            completed_date: None,
        }
    }

    /// 工单号，缺失时回退为 WO-{id}
    pub fn display_number(&self) -> String {
        self.wo_number
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("WO-{}", self.id))
    }
}

// ==========================================
// StockRecord - 库存记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub product_code: Option<String>,
    pub product_name: Option<String>,
    pub warehouse_name: Option<String>,
    pub quantity: Option<f64>,
    pub min_quantity: Option<f64>,
}

impl StockRecord {
    pub fn code(&self) -> String {
        self.product_code.clone().unwrap_or_else(|| "N/A".to_string())
    }

    pub fn name(&self) -> String {
        self.product_name
            .clone()
            .unwrap_or_else(|| "Producto desconocido".to_string())
    }

    pub fn warehouse(&self) -> String {
        self.warehouse_name.clone().unwrap_or_else(|| "N/A".to_string())
    }
}

// ==========================================
// Technician - 技术员
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technician {
    pub id: i64,
    pub name: Option<String>,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_number_fallback() {
        let mut wo = WorkOrder::new(42, WorkOrderStatus::InProgress);
        assert_eq!(wo.display_number(), "WO-42");
        wo.wo_number = Some("OT-2026-0042".to_string());
        assert_eq!(wo.display_number(), "OT-2026-0042");
    }
}
