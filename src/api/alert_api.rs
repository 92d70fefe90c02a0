// ==========================================
// ForgeDB 核心 - 服务告警 API
// ==========================================
// 职责: 告警查询（类别 / 严重度过滤 + 统计）、阈值维护、告警生命周期
// 架构: API 层 → ServiceAlertEngine / AlertRepository
// ==========================================

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::config::ThresholdConfig;
use crate::domain::alert::{Alert, AlertRecord, AlertStats, EscalationRecord};
use crate::domain::types::{AlertCategory, Severity};
use crate::engine::service_alert::ServiceAlertEngine;
use crate::repository::alert_repo::AlertRepository;

// ==========================================
// 响应结构
// ==========================================

/// 告警查询响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertsResponse {
    pub alerts: Vec<Alert>,
    pub stats: AlertStats,
    pub timestamp: DateTime<Utc>,
}

/// 告警变化摘要（排序后的告警 id + 数量）
///
/// 两次检测的摘要相同即视为无变化
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertDigest {
    pub count: usize,
    pub ids: Vec<String>,
}

impl AlertDigest {
    pub fn of(alerts: &[Alert]) -> Self {
        let mut ids: Vec<String> = alerts.iter().map(|a| a.id.clone()).collect();
        ids.sort();
        Self {
            count: alerts.len(),
            ids,
        }
    }
}

// ==========================================
// AlertApi - 服务告警 API
// ==========================================
pub struct AlertApi {
    engine: RwLock<ServiceAlertEngine>,
    alert_repo: Arc<dyn AlertRepository>,
}

impl AlertApi {
    /// # 参数
    /// - engine: 告警引擎
    /// - alert_repo: 告警存储（生命周期操作与历史查询）
    pub fn new(engine: ServiceAlertEngine, alert_repo: Arc<dyn AlertRepository>) -> Self {
        Self {
            engine: RwLock::new(engine),
            alert_repo,
        }
    }

    // ==========================================
    // 告警查询
    // ==========================================

    /// 查询当前告警
    ///
    /// # 参数
    /// - types: 类别名列表；None 或空表示全部，未知类别名忽略
    /// - severity: 严重度精确过滤；None 或空串表示不过滤
    ///
    /// # 返回
    /// - Ok(AlertsResponse): 告警（已排序）+ 过滤后的统计 + 时间戳
    /// - Err(ApiError::InvalidInput): 严重度无法识别
    pub fn get_alerts(&self, types: Option<&[String]>, severity: Option<&str>) -> ApiResult<AlertsResponse> {
        self.get_alerts_at(types, severity, Utc::now())
    }

    pub fn get_alerts_at(
        &self,
        types: Option<&[String]>,
        severity: Option<&str>,
        now: DateTime<Utc>,
    ) -> ApiResult<AlertsResponse> {
        let severity_filter = parse_severity_filter(severity)?;
        let categories = types.map(parse_categories);

        if let (Some(raw), Some(parsed)) = (types, categories.as_ref()) {
            // 全部类别名都无法识别时不做检测
            if !raw.is_empty() && parsed.is_empty() {
                return Ok(AlertsResponse {
                    alerts: Vec::new(),
                    stats: AlertStats::from_alerts(&[]),
                    timestamp: now,
                });
            }
        }

        let mut alerts = self
            .read_engine()?
            .get_active_alerts_at(categories.as_deref(), now);

        if let Some(wanted) = severity_filter {
            alerts.retain(|a| a.severity == wanted);
        }

        let stats = AlertStats::from_alerts(&alerts);
        Ok(AlertsResponse {
            alerts,
            stats,
            timestamp: now,
        })
    }

    /// 检测一次并返回全部告警（供轮询使用）
    pub fn poll(&self, now: DateTime<Utc>) -> ApiResult<Vec<Alert>> {
        Ok(self.read_engine()?.get_active_alerts_at(None, now))
    }

    /// 存储中的开放告警
    pub fn list_open_alerts(&self) -> ApiResult<Vec<AlertRecord>> {
        Ok(self.alert_repo.list_open_alerts()?)
    }

    /// 某告警的升级历史
    pub fn list_escalations(&self, alert_id: i64) -> ApiResult<Vec<EscalationRecord>> {
        Ok(self.alert_repo.list_escalations(alert_id)?)
    }

    // ==========================================
    // 告警生命周期
    // ==========================================

    pub fn mark_read(&self, alert_id: i64) -> ApiResult<AlertRecord> {
        Ok(self.alert_repo.mark_read(alert_id, Utc::now())?)
    }

    pub fn acknowledge(&self, alert_id: i64) -> ApiResult<AlertRecord> {
        let record = self.alert_repo.acknowledge(alert_id, Utc::now())?;
        tracing::info!(alert_id, "告警已确认");
        Ok(record)
    }

    /// 关闭告警（关闭后同一对象再次触发会新建告警）
    pub fn resolve(&self, alert_id: i64) -> ApiResult<AlertRecord> {
        let record = self.alert_repo.resolve(alert_id, Utc::now())?;
        tracing::info!(alert_id, "告警已关闭");
        Ok(record)
    }

    // ==========================================
    // 阈值维护
    // ==========================================

    pub fn thresholds(&self) -> ApiResult<ThresholdConfig> {
        Ok(self.read_engine()?.thresholds().clone())
    }

    /// 更新阈值（整体校验，任一项无效则全部不生效）
    pub fn update_thresholds(&self, updates: &BTreeMap<String, f64>) -> ApiResult<ThresholdConfig> {
        let mut engine = self
            .engine
            .write()
            .map_err(|e| ApiError::InternalError(format!("告警引擎锁获取失败: {}", e)))?;
        engine.update_thresholds(updates)?;
        Ok(engine.thresholds().clone())
    }

    fn read_engine(&self) -> ApiResult<std::sync::RwLockReadGuard<'_, ServiceAlertEngine>> {
        self.engine
            .read()
            .map_err(|e| ApiError::InternalError(format!("告警引擎锁获取失败: {}", e)))
    }
}

/// 解析类别名，未知类别名记录日志后忽略
fn parse_categories(raw: &[String]) -> Vec<AlertCategory> {
    raw.iter()
        .filter_map(|name| match AlertCategory::from_str(name.trim()) {
            Ok(category) => Some(category),
            Err(_) => {
                tracing::warn!(alert_type = %name, "未知的告警类别，已忽略");
                None
            }
        })
        .collect()
}

fn parse_severity_filter(raw: Option<&str>) -> ApiResult<Option<Severity>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Severity::from_str(value)
            .map(Some)
            .map_err(ApiError::InvalidInput),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_categories_skips_unknown() {
        let parsed = parse_categories(&["low_stock".to_string(), "bogus".to_string()]);
        assert_eq!(parsed, vec![AlertCategory::LowStock]);
    }

    #[test]
    fn test_parse_severity_filter() {
        assert_eq!(parse_severity_filter(None).unwrap(), None);
        assert_eq!(parse_severity_filter(Some("")).unwrap(), None);
        assert_eq!(parse_severity_filter(Some("high")).unwrap(), Some(Severity::High));
        assert!(parse_severity_filter(Some("urgent")).is_err());
    }

    #[test]
    fn test_digest_ignores_order() {
        let a = AlertDigest {
            count: 2,
            ids: vec!["a".to_string(), "b".to_string()],
        };
        let mut ids = vec!["b".to_string(), "a".to_string()];
        ids.sort();
        assert_eq!(a, AlertDigest { count: 2, ids });
        assert_eq!(AlertDigest::of(&[]), AlertDigest::default());
    }
}
