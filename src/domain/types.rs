// ==========================================
// ForgeDB 核心 - 领域类型定义
// ==========================================
// 告警严重度 / 告警状态 / 检测类别 / 工单状态
// 序列化格式: snake_case 小写 (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 告警严重度 (Severity)
// ==========================================
// 全序: Low < Medium < High < Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// 所有严重度，从高到低（排序/统计输出用）
    pub const DESCENDING: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("无效的告警严重度: {}", other)),
        }
    }
}

// ==========================================
// 告警状态 (Alert Status)
// ==========================================
// 开放状态: new / read / acknowledged
// 终态: resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    New,
    Read,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub const OPEN: [AlertStatus; 3] = [AlertStatus::New, AlertStatus::Read, AlertStatus::Acknowledged];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::New => "new",
            AlertStatus::Read => "read",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, AlertStatus::Resolved)
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(AlertStatus::New),
            "read" => Ok(AlertStatus::Read),
            "acknowledged" => Ok(AlertStatus::Acknowledged),
            "resolved" => Ok(AlertStatus::Resolved),
            other => Err(format!("无效的告警状态: {}", other)),
        }
    }
}

// ==========================================
// 检测类别 (Alert Category)
// ==========================================
// 每个类别对应一个检测器 (engine::alert_detectors::Detector)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    DelayedOrders,
    LowStock,
    OverloadedTechnicians,
    AnomalousServices,
    HighProductivity,
    UnassignedOrders,
}

impl AlertCategory {
    /// 检测顺序与注册顺序一致
    pub const ALL: [AlertCategory; 6] = [
        AlertCategory::DelayedOrders,
        AlertCategory::LowStock,
        AlertCategory::OverloadedTechnicians,
        AlertCategory::AnomalousServices,
        AlertCategory::HighProductivity,
        AlertCategory::UnassignedOrders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::DelayedOrders => "delayed_orders",
            AlertCategory::LowStock => "low_stock",
            AlertCategory::OverloadedTechnicians => "overloaded_technicians",
            AlertCategory::AnomalousServices => "anomalous_services",
            AlertCategory::HighProductivity => "high_productivity",
            AlertCategory::UnassignedOrders => "unassigned_orders",
        }
    }

    /// 检测类别 → 存储告警类型
    pub fn stored_type(&self) -> StoredAlertType {
        match self {
            AlertCategory::DelayedOrders => StoredAlertType::Maintenance,
            AlertCategory::LowStock => StoredAlertType::Inventory,
            AlertCategory::OverloadedTechnicians
            | AlertCategory::AnomalousServices
            | AlertCategory::HighProductivity
            | AlertCategory::UnassignedOrders => StoredAlertType::Business,
        }
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        AlertCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| format!("未知的告警类别: {}", s))
    }
}

// ==========================================
// 存储告警类型 (Stored Alert Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredAlertType {
    Inventory,
    Maintenance,
    Business,
    System,
}

impl StoredAlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoredAlertType::Inventory => "inventory",
            StoredAlertType::Maintenance => "maintenance",
            StoredAlertType::Business => "business",
            StoredAlertType::System => "system",
        }
    }
}

impl fmt::Display for StoredAlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoredAlertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inventory" => Ok(StoredAlertType::Inventory),
            "maintenance" => Ok(StoredAlertType::Maintenance),
            "business" => Ok(StoredAlertType::Business),
            "system" => Ok(StoredAlertType::System),
            other => Err(format!("无效的告警类型: {}", other)),
        }
    }
}

// ==========================================
// 工单状态 (Work Order Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    Draft,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl WorkOrderStatus {
    /// 活动工单: 已排程 + 进行中
    pub const ACTIVE: [WorkOrderStatus; 2] = [WorkOrderStatus::Scheduled, WorkOrderStatus::InProgress];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderStatus::Draft => "draft",
            WorkOrderStatus::Scheduled => "scheduled",
            WorkOrderStatus::InProgress => "in_progress",
            WorkOrderStatus::Completed => "completed",
            WorkOrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkOrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(WorkOrderStatus::Draft),
            "scheduled" => Ok(WorkOrderStatus::Scheduled),
            "in_progress" => Ok(WorkOrderStatus::InProgress),
            "completed" => Ok(WorkOrderStatus::Completed),
            "cancelled" => Ok(WorkOrderStatus::Cancelled),
            other => Err(format!("无效的工单状态: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(Severity::DESCENDING[0], Severity::Critical);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn test_category_round_trip_names() {
        for category in AlertCategory::ALL {
            assert_eq!(category.as_str().parse::<AlertCategory>().unwrap(), category);
        }
        assert!("unknown".parse::<AlertCategory>().is_err());
    }

    #[test]
    fn test_category_stored_type() {
        assert_eq!(AlertCategory::DelayedOrders.stored_type(), StoredAlertType::Maintenance);
        assert_eq!(AlertCategory::LowStock.stored_type(), StoredAlertType::Inventory);
        assert_eq!(AlertCategory::AnomalousServices.stored_type(), StoredAlertType::Business);
        assert_eq!(AlertCategory::UnassignedOrders.stored_type(), StoredAlertType::Business);
    }

    #[test]
    fn test_status_open() {
        assert!(AlertStatus::New.is_open());
        assert!(AlertStatus::Acknowledged.is_open());
        assert!(!AlertStatus::Resolved.is_open());
    }
}
