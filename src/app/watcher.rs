// ==========================================
// ForgeDB 核心 - 告警轮询监听
// ==========================================
// 职责: 周期性执行告警检测，按摘要判断变化并输出事件
// 事件: connected / alerts_update / heartbeat / error（JSON 行）
// 检测为同步阻塞调用，放在 spawn_blocking 中执行
// ==========================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::api::{AlertApi, AlertDigest};
use crate::domain::alert::Alert;
use crate::domain::types::Severity;

/// 默认轮询周期（秒）
pub const DEFAULT_POLL_SECS: u64 = 5;

/// alerts_update 事件携带的告警数上限
pub const UPDATE_ALERT_LIMIT: usize = 10;

// ==========================================
// WatcherSettings - 进程级配置（环境变量）
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct WatcherSettings {
    pub db_path: String,
    pub poll_interval: Duration,
    pub user_id: Option<i64>,
}

impl WatcherSettings {
    /// 从环境变量读取
    ///
    /// # 环境变量
    /// - FORGE_CORE_DB_PATH: 数据库路径（默认用户数据目录）
    /// - FORGE_CORE_POLL_SECS: 轮询周期秒数（默认 5）
    /// - FORGE_CORE_USER_ID: 操作人 id
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let poll_secs = match lookup("FORGE_CORE_POLL_SECS") {
            None => DEFAULT_POLL_SECS,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    tracing::warn!(value = %raw, "FORGE_CORE_POLL_SECS 无效，使用默认值");
                    DEFAULT_POLL_SECS
                }
            },
        };

        let user_id = lookup("FORGE_CORE_USER_ID").and_then(|raw| match raw.trim().parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!(value = %raw, "FORGE_CORE_USER_ID 无效，已忽略");
                None
            }
        });

        let db_path = lookup("FORGE_CORE_DB_PATH")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(crate::db::get_default_db_path);

        Self {
            db_path,
            poll_interval: Duration::from_secs(poll_secs),
            user_id,
        }
    }
}

// ==========================================
// WatchEvent - 输出事件
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WatchEvent {
    Connected {
        stream_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    AlertsUpdate {
        stream_id: Uuid,
        count: usize,
        alerts: Vec<Alert>,
        stats: BTreeMap<Severity, usize>,
        timestamp: DateTime<Utc>,
    },
    Heartbeat {
        stream_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    Error {
        stream_id: Uuid,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl WatchEvent {
    /// 单行 JSON
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"事件序列化失败: {}"}}"#, e)
        })
    }
}

// ==========================================
// AlertWatcher - 轮询状态
// ==========================================
pub struct AlertWatcher {
    api: Arc<AlertApi>,
    stream_id: Uuid,
    last_digest: Option<AlertDigest>,
}

impl AlertWatcher {
    pub fn new(api: Arc<AlertApi>) -> Self {
        Self {
            api,
            stream_id: Uuid::new_v4(),
            last_digest: None,
        }
    }

    pub fn stream_id(&self) -> Uuid {
        self.stream_id
    }

    pub fn connected(&self) -> WatchEvent {
        WatchEvent::Connected {
            stream_id: self.stream_id,
            timestamp: Utc::now(),
        }
    }

    /// 根据本轮检测结果生成事件
    ///
    /// 摘要（排序后的 id + 数量）变化时输出 alerts_update，否则输出 heartbeat
    pub fn observe(&mut self, alerts: Vec<Alert>, now: DateTime<Utc>) -> WatchEvent {
        let digest = AlertDigest::of(&alerts);
        if self.last_digest.as_ref() == Some(&digest) {
            return WatchEvent::Heartbeat {
                stream_id: self.stream_id,
                timestamp: now,
            };
        }
        self.last_digest = Some(digest);

        let mut stats: BTreeMap<Severity, usize> = Severity::DESCENDING.iter().map(|s| (*s, 0)).collect();
        for alert in &alerts {
            *stats.entry(alert.severity).or_insert(0) += 1;
        }

        let count = alerts.len();
        let mut alerts = alerts;
        alerts.truncate(UPDATE_ALERT_LIMIT);

        WatchEvent::AlertsUpdate {
            stream_id: self.stream_id,
            count,
            alerts,
            stats,
            timestamp: now,
        }
    }

    /// 执行一轮检测（在阻塞线程池中运行）
    ///
    /// 检测失败或任务异常时输出 error 事件，不中断轮询
    pub async fn tick(&mut self) -> WatchEvent {
        let api = self.api.clone();
        let now = Utc::now();
        let result = tokio::task::spawn_blocking(move || api.poll(now)).await;

        match result {
            Ok(Ok(alerts)) => self.observe(alerts, now),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "告警检测失败");
                self.error_event(e.to_string(), now)
            }
            Err(e) => {
                tracing::error!(error = %e, "告警检测任务异常");
                self.error_event(e.to_string(), now)
            }
        }
    }

    fn error_event(&self, message: String, now: DateTime<Utc>) -> WatchEvent {
        WatchEvent::Error {
            stream_id: self.stream_id,
            message,
            timestamp: now,
        }
    }
}
