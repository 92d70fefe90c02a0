// ==========================================
// ForgeDB 核心 - 服务告警引擎
// ==========================================
// 职责: 运行检测器 → 升级判定 → 按自然键 upsert → 排序输出
// 输入: OperationsRepository（只读）+ AlertRepository（原子 upsert / 升级）
// 输出: Vec<Alert>（critical → low，同级按 priority 降序）
// ==========================================
// 红线:
// - 每次调用都重新检测，不缓存检测结果
// - 单个类别失败只记录日志，不影响其他类别
// - 持久化失败只记录日志，告警仍然返回
// ==========================================

use crate::config::{ConfigError, ThresholdConfig, ThresholdStore};
use crate::domain::alert::{Alert, AlertRecord, EscalationRecord, NewAlert, RawAlert};
use crate::domain::types::AlertCategory;
use crate::engine::alert_detectors::Detector;
use crate::engine::escalation::{next_severity, EscalationStep};
use crate::i18n::{t, t_with_args};
use crate::repository::alert_repo::AlertRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::operations_repo::OperationsRepository;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

// ==========================================
// ServiceAlertEngine - 服务告警引擎
// ==========================================
pub struct ServiceAlertEngine {
    operations: Arc<dyn OperationsRepository>,
    alerts: Arc<dyn AlertRepository>,
    threshold_store: Option<Arc<dyn ThresholdStore>>,
    thresholds: ThresholdConfig,
    user_id: Option<i64>,
}

impl ServiceAlertEngine {
    /// 构造函数
    ///
    /// # 参数
    /// - operations: 运营数据源
    /// - alerts: 告警存储
    /// - thresholds: 阈值（显式注入）
    pub fn new(
        operations: Arc<dyn OperationsRepository>,
        alerts: Arc<dyn AlertRepository>,
        thresholds: ThresholdConfig,
    ) -> Self {
        Self {
            operations,
            alerts,
            threshold_store: None,
            thresholds,
            user_id: None,
        }
    }

    /// 从阈值存储加载阈值（失败时使用默认值）
    pub fn load(
        operations: Arc<dyn OperationsRepository>,
        alerts: Arc<dyn AlertRepository>,
        store: Arc<dyn ThresholdStore>,
    ) -> Self {
        let thresholds = match store.read_active_thresholds() {
            Ok(values) => {
                tracing::debug!(count = values.len(), "已从存储加载告警阈值");
                ThresholdConfig::from_map(&values)
            }
            Err(e) => {
                tracing::warn!(error = %e, "告警阈值加载失败，使用默认值");
                ThresholdConfig::default()
            }
        };
        Self::new(operations, alerts, thresholds).with_threshold_store(store)
    }

    pub fn with_threshold_store(mut self, store: Arc<dyn ThresholdStore>) -> Self {
        self.threshold_store = Some(store);
        self
    }

    /// 操作人（写入 created_for / escalated_by / updated_by）
    pub fn with_user_id(mut self, user_id: Option<i64>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    // ==========================================
    // 阈值更新
    // ==========================================

    /// 更新阈值
    ///
    /// 新配置整体校验后替换当前配置；持久化失败只记录日志。
    pub fn update_thresholds(&mut self, updates: &BTreeMap<String, f64>) -> Result<(), ConfigError> {
        self.thresholds = self.thresholds.with_updates(updates)?;

        if let Some(store) = &self.threshold_store {
            let mut saved = 0usize;
            for (key, value) in updates {
                match store.upsert_threshold(key, *value, self.user_id) {
                    Ok(()) => saved += 1,
                    Err(e) => tracing::error!(key = %key, error = %e, "阈值持久化失败"),
                }
            }
            tracing::info!(saved, total = updates.len(), "告警阈值已更新");
        }
        Ok(())
    }

    // ==========================================
    // 检测主流程
    // ==========================================

    /// 获取当前告警（每次调用重新检测）
    ///
    /// # 参数
    /// - alert_types: 要检测的类别；None 或空表示全部
    pub fn get_active_alerts(&self, alert_types: Option<&[AlertCategory]>) -> Vec<Alert> {
        self.get_active_alerts_at(alert_types, Utc::now())
    }

    /// 以指定时刻执行一次检测
    pub fn get_active_alerts_at(&self, alert_types: Option<&[AlertCategory]>, now: DateTime<Utc>) -> Vec<Alert> {
        let requested = |detector: &Detector| match alert_types {
            None => true,
            Some(types) if types.is_empty() => true,
            Some(types) => types.contains(&detector.category()),
        };

        let raw_alerts: Vec<RawAlert> = Detector::REGISTRY
            .iter()
            .filter(|d| requested(*d))
            .flat_map(|d| self.run_detector(*d, now))
            .collect();

        let mut alerts: Vec<Alert> = raw_alerts.into_iter().map(|raw| self.process(raw, now)).collect();
        sort_alerts(&mut alerts);

        tracing::debug!(count = alerts.len(), "告警检测完成");
        alerts
    }

    /// 运行单个检测器（失败返回空结果）
    pub fn run_detector(&self, detector: Detector, now: DateTime<Utc>) -> Vec<RawAlert> {
        match detector.detect(self.operations.as_ref(), &self.thresholds, now) {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(category = %detector.category(), error = %e, "告警检测失败，跳过该类别");
                Vec::new()
            }
        }
    }

    /// 升级判定 + upsert
    fn process(&self, raw: RawAlert, now: DateTime<Utc>) -> Alert {
        let mut alert = Alert::from_raw(raw);
        let reference = alert.reference();

        let existing = match self.alerts.find_open_alert(alert.alert_type, &reference) {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(id = %alert.id, error = %e, "查询开放告警失败");
                None
            }
        };

        if let Some(existing) = &existing {
            if let Err(e) = self.apply_escalation(&mut alert, existing, now) {
                tracing::error!(alert_id = existing.alert_id, error = %e, "告警升级判定失败");
            }
            alert.status = existing.status;
            alert.created_at = Some(existing.created_at);
        }

        let payload = NewAlert {
            category: alert.alert_type,
            reference,
            title: alert.title.clone(),
            message: alert.message.clone(),
            details: alert.details.clone(),
            severity: alert.severity,
            created_for: self.user_id,
            observed_at: now,
        };

        match self.alerts.upsert_open_alert(&payload) {
            Ok(outcome) => {
                alert.db_alert_id = Some(outcome.alert_id);
                if outcome.created {
                    alert.created_at = Some(now);
                }
            }
            Err(e) => tracing::error!(id = %alert.id, error = %e, "告警保存失败"),
        }

        alert
    }

    /// 升级判定
    ///
    /// 已升级过的告警保持升级后的严重度（不被本次检测结果回退）
    fn apply_escalation(&self, alert: &mut Alert, existing: &AlertRecord, now: DateTime<Utc>) -> RepositoryResult<()> {
        let level = self.alerts.escalation_level(existing.alert_id)?;
        let hours_elapsed = (now - existing.created_at).num_milliseconds() as f64 / 3_600_000.0;

        if let Some(step) = next_severity(alert.severity, hours_elapsed, level, &self.thresholds) {
            let record = EscalationRecord {
                escalation_id: None,
                alert_id: existing.alert_id,
                original_severity: step.from,
                escalated_severity: step.to,
                escalation_level: level + 1,
                escalated_by: self.user_id,
                created_at: now,
                notes: Some(escalation_note(&step, hours_elapsed)),
            };

            if self.alerts.record_escalation(&record)? {
                if step.is_supervisor_flag() {
                    tracing::warn!(
                        alert_id = existing.alert_id,
                        hours_elapsed,
                        "critical 告警长时间未处理，需要主管关注"
                    );
                } else {
                    tracing::info!(
                        alert_id = existing.alert_id,
                        from = %step.from,
                        to = %step.to,
                        "告警已升级"
                    );
                }
                alert.severity = step.to;
                alert.escalated = true;
                alert.escalation_level = record.escalation_level;
                alert.original_severity = Some(step.from);
                return Ok(());
            }
        }

        let level = self.alerts.escalation_level(existing.alert_id)?;
        if level > 0 {
            let latest = self.alerts.latest_escalation(existing.alert_id)?;
            let mut severity = alert.severity.max(existing.severity);
            if let Some(latest) = &latest {
                severity = severity.max(latest.escalated_severity);
            }
            alert.severity = severity;
            alert.escalated = true;
            alert.escalation_level = level;
            alert.original_severity = latest.map(|r| r.original_severity);
        }
        Ok(())
    }
}

fn escalation_note(step: &EscalationStep, hours_elapsed: f64) -> String {
    if step.is_supervisor_flag() {
        return t("alerts.escalation.critical_note");
    }
    t_with_args(
        "alerts.escalation.note",
        &[
            ("from", step.from.as_str()),
            ("to", step.to.as_str()),
            ("hours", &format!("{:.1}", hours_elapsed)),
        ],
    )
}

/// 排序: 严重度降序，同级 priority 降序
pub fn sort_alerts(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.priority.cmp(&a.priority))
    });
}
