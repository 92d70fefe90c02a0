// ==========================================
// ForgeDB 核心 - 服务告警领域模型
// ==========================================
// 职责: 检测输出 (RawAlert) / 引擎输出 (Alert) / 存储记录 (AlertRecord)
//       升级记录 (EscalationRecord) / 统计 (AlertStats)
// 不变量: 同一 (类别, 引用) 任一时刻至多一条开放告警
// ==========================================

use crate::domain::types::{AlertCategory, AlertStatus, Severity, StoredAlertType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 聚合告警的引用实体名
pub const AGGREGATE_ENTITY: &str = "aggregate";

// ==========================================
// AlertReference - 告警引用的业务对象
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertReference {
    pub ref_entity: Option<String>,
    pub ref_id: Option<i64>,
    pub ref_code: Option<String>,
}

impl AlertReference {
    pub fn work_order(wo_id: i64, wo_number: impl Into<String>) -> Self {
        Self {
            ref_entity: Some("work_order".to_string()),
            ref_id: Some(wo_id),
            ref_code: Some(wo_number.into()),
        }
    }

    pub fn technician(technician_id: i64) -> Self {
        Self {
            ref_entity: Some("technician".to_string()),
            ref_id: Some(technician_id),
            ref_code: None,
        }
    }

    /// 按日区分的技术员引用 (例如当日绩效)
    pub fn technician_on(technician_id: i64, day: impl Into<String>) -> Self {
        Self {
            ref_entity: Some("technician".to_string()),
            ref_id: Some(technician_id),
            ref_code: Some(day.into()),
        }
    }

    /// 聚合告警: 以合成 id 作为引用编码
    pub fn aggregate(code: impl Into<String>) -> Self {
        Self {
            ref_entity: Some(AGGREGATE_ENTITY.to_string()),
            ref_id: None,
            ref_code: Some(code.into()),
        }
    }

    /// 自然键 (entity[:id][/code])，用于开放告警去重
    pub fn ref_key(&self) -> String {
        let mut key = self
            .ref_entity
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        if let Some(id) = self.ref_id {
            key.push(':');
            key.push_str(&id.to_string());
        }
        if let Some(code) = &self.ref_code {
            key.push('/');
            key.push_str(code);
        }
        key
    }
}

// ==========================================
// RawAlert - 检测器输出
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAlert {
    pub id: String,                 // 合成 id，例如 delayed_wo_17
    pub category: AlertCategory,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub priority: i64,              // 越大越紧急
    pub action_url: String,
    pub details: Value,
    pub reference: AlertReference,
}

// ==========================================
// Alert - 引擎输出 (已完成升级判定与持久化)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertCategory,
    pub severity: Severity,
    pub status: AlertStatus,
    pub title: String,
    pub message: String,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
    pub priority: i64,
    pub action_url: String,

    // ===== 引用 =====
    pub ref_entity: Option<String>,
    pub ref_id: Option<i64>,
    pub ref_code: Option<String>,

    // ===== 升级 =====
    pub escalated: bool,
    pub escalation_level: i32,
    pub original_severity: Option<Severity>,

    // ===== 持久化 =====
    pub db_alert_id: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn from_raw(raw: RawAlert) -> Self {
        Self {
            id: raw.id,
            alert_type: raw.category,
            severity: raw.severity,
            status: AlertStatus::New,
            title: raw.title,
            message: raw.message,
            details: raw.details,
            timestamp: raw.timestamp,
            priority: raw.priority,
            action_url: raw.action_url,
            ref_entity: raw.reference.ref_entity,
            ref_id: raw.reference.ref_id,
            ref_code: raw.reference.ref_code,
            escalated: false,
            escalation_level: 0,
            original_severity: None,
            db_alert_id: None,
            created_at: None,
        }
    }

    pub fn reference(&self) -> AlertReference {
        AlertReference {
            ref_entity: self.ref_entity.clone(),
            ref_id: self.ref_id,
            ref_code: self.ref_code.clone(),
        }
    }
}

// ==========================================
// AlertRecord - 存储的告警 (alerts 表)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub alert_id: i64,
    pub alert_type: StoredAlertType,
    pub category: Option<AlertCategory>,
    pub ref_entity: Option<String>,
    pub ref_id: Option<i64>,
    pub ref_code: Option<String>,
    pub ref_key: Option<String>,
    pub title: String,
    pub message: String,
    pub details: Value,
    pub severity: Severity,
    pub status: AlertStatus,
    pub assigned_to: Option<i64>,
    pub created_for: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// 新建/更新开放告警的载荷
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub category: AlertCategory,
    pub reference: AlertReference,
    pub title: String,
    pub message: String,
    pub details: Value,
    pub severity: Severity,
    pub created_for: Option<i64>,
    pub observed_at: DateTime<Utc>,
}

impl NewAlert {
    pub fn alert_type(&self) -> StoredAlertType {
        self.category.stored_type()
    }

    pub fn ref_key(&self) -> String {
        self.reference.ref_key()
    }
}

/// upsert 结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub alert_id: i64,
    pub created: bool,
}

// ==========================================
// EscalationRecord - 升级记录
// ==========================================
// 不变量: 同一告警的 escalation_level 严格递增
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub escalation_id: Option<i64>,
    pub alert_id: i64,
    pub original_severity: Severity,
    pub escalated_severity: Severity,
    pub escalation_level: i32,
    pub escalated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
}

// ==========================================
// AlertStats - 告警统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertStats {
    pub total: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_type: BTreeMap<AlertCategory, usize>,
}

impl AlertStats {
    pub fn from_alerts(alerts: &[Alert]) -> Self {
        let mut by_severity: BTreeMap<Severity, usize> =
            Severity::DESCENDING.iter().map(|s| (*s, 0)).collect();
        let mut by_type = BTreeMap::new();

        for alert in alerts {
            *by_severity.entry(alert.severity).or_insert(0) += 1;
            *by_type.entry(alert.alert_type).or_insert(0) += 1;
        }

        Self {
            total: alerts.len(),
            by_severity,
            by_type,
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(category: AlertCategory, severity: Severity) -> RawAlert {
        RawAlert {
            id: format!("{}_1", category),
            category,
            severity,
            title: "t".to_string(),
            message: "m".to_string(),
            timestamp: Utc::now(),
            priority: 10,
            action_url: "/".to_string(),
            details: json!({}),
            reference: AlertReference::technician(1),
        }
    }

    #[test]
    fn test_ref_key_formats() {
        assert_eq!(AlertReference::work_order(17, "WO-17").ref_key(), "work_order:17/WO-17");
        assert_eq!(AlertReference::technician(3).ref_key(), "technician:3");
        assert_eq!(
            AlertReference::aggregate("low_stock_critical").ref_key(),
            "aggregate/low_stock_critical"
        );
        assert_eq!(
            AlertReference::technician_on(3, "2026-10-17").ref_key(),
            "technician:3/2026-10-17"
        );
    }

    #[test]
    fn test_alert_from_raw() {
        let alert = Alert::from_raw(raw(AlertCategory::OverloadedTechnicians, Severity::Medium));
        assert_eq!(alert.status, AlertStatus::New);
        assert_eq!(alert.escalation_level, 0);
        assert!(!alert.escalated);
        assert_eq!(alert.ref_id, Some(1));
        assert_eq!(alert.reference(), AlertReference::technician(1));
    }

    #[test]
    fn test_alert_serializes_type_field() {
        let alert = Alert::from_raw(raw(AlertCategory::LowStock, Severity::Critical));
        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["type"], "low_stock");
        assert_eq!(value["severity"], "critical");
    }

    #[test]
    fn test_stats() {
        let alerts = vec![
            Alert::from_raw(raw(AlertCategory::LowStock, Severity::Critical)),
            Alert::from_raw(raw(AlertCategory::LowStock, Severity::Medium)),
            Alert::from_raw(raw(AlertCategory::UnassignedOrders, Severity::Medium)),
        ];
        let stats = AlertStats::from_alerts(&alerts);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.count(Severity::Critical), 1);
        assert_eq!(stats.count(Severity::Medium), 2);
        assert_eq!(stats.count(Severity::Low), 0);
        assert_eq!(stats.by_type.get(&AlertCategory::LowStock), Some(&2));
    }
}
