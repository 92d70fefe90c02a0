// ==========================================
// AlertApi / QuoteApi / 监听 集成测试
// ==========================================
// 测试范围:
// 1. 告警查询: 类别过滤、严重度过滤、统计
// 2. 告警生命周期: 已读 / 确认 / 关闭
// 3. 阈值维护: 校验与持久化
// 4. 轮询监听: 变化输出 alerts_update，无变化输出 heartbeat
// 5. 报价预览（配置的默认费率）
// ==========================================

mod test_helpers;

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use forge_core::api::ApiError;
use forge_core::app::{AlertWatcher, AppState, WatchEvent};
use forge_core::config::config_keys;
use forge_core::domain::types::{AlertCategory, AlertStatus, Severity};
use rust_decimal_macros::dec;
use serde_json::json;
use tempfile::NamedTempFile;

use test_helpers::{create_test_db, insert_stock, insert_technician, insert_work_order};

// ==========================================
// 测试环境
// ==========================================

/// 已写入运营数据的数据库 + AppState
///
/// 数据: 进行中延误 12 小时工单（critical）、未分派工单（medium）、售罄库存（critical）
fn seeded_state() -> (NamedTempFile, AppState) {
    forge_core::i18n::init();
    let (db, path) = create_test_db().expect("无法创建测试数据库");
    {
        let conn = forge_core::db::open_sqlite_connection(&path).unwrap();
        let now = Utc::now();
        insert_technician(&conn, 1, "Ana Torres", true).unwrap();
        insert_work_order(&conn, 1, "in_progress", Some(1), Some(now - Duration::hours(12)), Some(40.0), None, None)
            .unwrap();
        insert_work_order(&conn, 2, "scheduled", None, Some(now + Duration::hours(24)), Some(2.0), None, None)
            .unwrap();
        insert_stock(&conn, "FLT-1", 0.0, 10.0).unwrap();
        insert_stock(&conn, "REF-7", 50.0, 10.0).unwrap();
    }
    let state = AppState::new(&path, Some(5)).expect("无法创建AppState");
    (db, state)
}

// ==========================================
// 告警查询
// ==========================================

#[test]
fn test_get_alerts_with_stats() {
    let (_db, state) = seeded_state();
    let response = state.alert_api.get_alerts(None, None).unwrap();

    assert_eq!(response.alerts.len(), 3);
    assert_eq!(response.stats.total, 3);
    assert_eq!(response.stats.count(Severity::Critical), 2);
    assert_eq!(response.stats.count(Severity::Medium), 1);
    assert_eq!(response.stats.count(Severity::Low), 0);
    assert_eq!(response.stats.by_type.get(&AlertCategory::LowStock), Some(&1));
    assert_eq!(response.alerts[2].alert_type, AlertCategory::UnassignedOrders);
}

#[test]
fn test_get_alerts_filters() {
    let (_db, state) = seeded_state();

    let types = vec!["delayed_orders".to_string(), "no_such_type".to_string()];
    let response = state.alert_api.get_alerts(Some(&types), None).unwrap();
    assert_eq!(response.alerts.len(), 1);
    assert_eq!(response.alerts[0].id, "delayed_wo_1");

    let response = state.alert_api.get_alerts(None, Some("medium")).unwrap();
    assert_eq!(response.alerts.len(), 1);
    assert_eq!(response.stats.total, 1);

    let only_unknown = vec!["bogus".to_string()];
    let response = state.alert_api.get_alerts(Some(&only_unknown), None).unwrap();
    assert!(response.alerts.is_empty());

    let err = state.alert_api.get_alerts(None, Some("urgent")).unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

// ==========================================
// 生命周期
// ==========================================

#[test]
fn test_alert_lifecycle() {
    let (_db, state) = seeded_state();
    let response = state.alert_api.get_alerts(None, None).unwrap();
    let alert_id = response.alerts[0].db_alert_id.unwrap();

    let read = state.alert_api.mark_read(alert_id).unwrap();
    assert_eq!(read.status, AlertStatus::Read);
    assert!(read.read_at.is_some());

    let acked = state.alert_api.acknowledge(alert_id).unwrap();
    assert_eq!(acked.status, AlertStatus::Acknowledged);
    assert!(acked.acknowledged_at.is_some());

    let resolved = state.alert_api.resolve(alert_id).unwrap();
    assert_eq!(resolved.status, AlertStatus::Resolved);
    assert!(resolved.resolved_at.is_some());

    let err = state.alert_api.mark_read(alert_id).unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { .. }));

    let err = state.alert_api.resolve(987_654).unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    assert_eq!(state.alert_api.list_open_alerts().unwrap().len(), 2);
    assert!(state.alert_api.list_escalations(alert_id).unwrap().is_empty());
}

// ==========================================
// 阈值
// ==========================================

#[test]
fn test_update_thresholds_through_api() {
    let (_db, state) = seeded_state();

    let mut updates = BTreeMap::new();
    updates.insert("delayed_order_hours".to_string(), 24.0);
    let config = state.alert_api.update_thresholds(&updates).unwrap();
    assert_eq!(config.delayed_order_hours, 24.0);

    // 延误 12 小时不再超过 24 小时阈值
    let types = vec!["delayed_orders".to_string()];
    assert!(state.alert_api.get_alerts(Some(&types), None).unwrap().alerts.is_empty());

    // 重新组装后从存储读取
    let reloaded = AppState::new(&state.db_path, None).unwrap();
    assert_eq!(reloaded.alert_api.thresholds().unwrap().delayed_order_hours, 24.0);

    let mut bad = BTreeMap::new();
    bad.insert("delayed_order_hours".to_string(), 0.0);
    let err = state.alert_api.update_thresholds(&bad).unwrap_err();
    assert!(matches!(err, ApiError::ConfigError(_)));
    assert_eq!(state.alert_api.thresholds().unwrap().delayed_order_hours, 24.0);
}

// ==========================================
// 轮询监听
// ==========================================

#[tokio::test]
async fn test_watcher_emits_update_then_heartbeat() {
    let (_db, state) = seeded_state();
    let mut watcher = AlertWatcher::new(state.alert_api.clone());

    match watcher.connected() {
        WatchEvent::Connected { stream_id, .. } => assert_eq!(stream_id, watcher.stream_id()),
        other => panic!("Expected Connected, got {:?}", other),
    }

    match watcher.tick().await {
        WatchEvent::AlertsUpdate { count, alerts, stats, .. } => {
            assert_eq!(count, 3);
            assert_eq!(alerts.len(), 3);
            assert_eq!(stats.get(&Severity::Critical), Some(&2));
        }
        other => panic!("Expected AlertsUpdate, got {:?}", other),
    }

    let event = watcher.tick().await;
    assert!(matches!(event, WatchEvent::Heartbeat { .. }));

    let line = event.to_json_line();
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["type"], "heartbeat");
}

#[tokio::test]
async fn test_watcher_detects_change() {
    let (_db, state) = seeded_state();
    let mut watcher = AlertWatcher::new(state.alert_api.clone());
    assert!(matches!(watcher.tick().await, WatchEvent::AlertsUpdate { .. }));

    {
        let conn = forge_core::db::open_sqlite_connection(&state.db_path).unwrap();
        insert_stock(&conn, "BUJ-2", 1.0, 20.0).unwrap();
    }

    match watcher.tick().await {
        WatchEvent::AlertsUpdate { count, .. } => assert_eq!(count, 4),
        other => panic!("Expected AlertsUpdate, got {:?}", other),
    }
}

// ==========================================
// 报价
// ==========================================

#[test]
fn test_quote_preview_uses_configured_rate() {
    forge_core::i18n::init();
    let (_db, path) = create_test_db().unwrap();
    {
        let state = AppState::new(&path, None).unwrap();
        state
            .config_manager
            .set_global_config_value(config_keys::QUOTE_DEFAULT_HOURLY_RATE, "650")
            .unwrap();
    }

    let state = AppState::new(&path, None).unwrap();
    let preview = state
        .quote_api
        .preview_quote(&json!({"items": [{"hours": 2}], "tax_percent": 0}))
        .unwrap();
    assert_eq!(preview.totals.labor_total, dec!(1300.00));
    assert_eq!(preview.totals.total, dec!(1300.00));
    assert!(preview.validation.valid);
}
