// ==========================================
// ForgeDB 核心 - 告警 Repository 实现
// ==========================================
// 职责: 实现告警/升级记录数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 并发: 读-改-写序列统一使用 BEGIN IMMEDIATE 事务；
//       开放告警的自然键由部分唯一索引 ux_alerts_open_ref 兜底
// ==========================================

use crate::db::{format_timestamp, open_sqlite_connection, parse_timestamp};
use crate::domain::alert::{AlertRecord, AlertReference, EscalationRecord, NewAlert, UpsertOutcome};
use crate::domain::types::{AlertCategory, AlertStatus};
use crate::repository::alert_repo::AlertRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde_json::Value;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

const ALERT_COLUMNS: &str = "alert_id, alert_type, category, ref_entity, ref_id, ref_code, ref_key, \
     title, message, details, severity, status, assigned_to, created_for, \
     created_at, updated_at, read_at, acknowledged_at, resolved_at";

const ESCALATION_COLUMNS: &str = "escalation_id, alert_id, original_severity, escalated_severity, \
     escalation_level, escalated_by, escalated_at, notes";

const OPEN_STATUS_SQL: &str = "('new', 'read', 'acknowledged')";

// ==========================================
// 行映射
// ==========================================

fn conversion_err(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn enum_col<T: FromStr<Err = String>>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conversion_err(idx, e))
}

fn ts_col(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| conversion_err(idx, format!("无效时间: {}", raw)))
}

fn opt_ts_col(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| conversion_err(idx, format!("无效时间: {}", raw))),
    }
}

fn map_alert_row(row: &Row) -> rusqlite::Result<AlertRecord> {
    let category: Option<String> = row.get(2)?;
    let category = match category {
        Some(raw) => Some(
            raw.parse::<AlertCategory>()
                .map_err(|e| conversion_err(2, e))?,
        ),
        None => None,
    };

    // details 以 JSON 文本保存；历史数据非 JSON 时按字符串保留
    let details: Option<String> = row.get(9)?;
    let details = match details {
        Some(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        None => Value::Null,
    };

    Ok(AlertRecord {
        alert_id: row.get(0)?,
        alert_type: enum_col(row, 1)?,
        category,
        ref_entity: row.get(3)?,
        ref_id: row.get(4)?,
        ref_code: row.get(5)?,
        ref_key: row.get(6)?,
        title: row.get(7)?,
        message: row.get(8)?,
        details,
        severity: enum_col(row, 10)?,
        status: enum_col(row, 11)?,
        assigned_to: row.get(12)?,
        created_for: row.get(13)?,
        created_at: ts_col(row, 14)?,
        updated_at: ts_col(row, 15)?,
        read_at: opt_ts_col(row, 16)?,
        acknowledged_at: opt_ts_col(row, 17)?,
        resolved_at: opt_ts_col(row, 18)?,
    })
}

fn map_escalation_row(row: &Row) -> rusqlite::Result<EscalationRecord> {
    Ok(EscalationRecord {
        escalation_id: row.get(0)?,
        alert_id: row.get(1)?,
        original_severity: enum_col(row, 2)?,
        escalated_severity: enum_col(row, 3)?,
        escalation_level: row.get(4)?,
        escalated_by: row.get(5)?,
        created_at: ts_col(row, 6)?,
        notes: row.get(7)?,
    })
}

fn details_json(alert: &NewAlert) -> RepositoryResult<String> {
    serde_json::to_string(&alert.details).map_err(|e| RepositoryError::FieldValueError {
        field: "details".to_string(),
        message: e.to_string(),
    })
}

fn alert_not_found(alert_id: i64) -> RepositoryError {
    RepositoryError::NotFound {
        entity: "Alert".to_string(),
        id: alert_id.to_string(),
    }
}

// ==========================================
// AlertRepositoryImpl
// ==========================================
pub struct AlertRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl AlertRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 事务内辅助 =====

    fn find_by_id_tx(conn: &Connection, alert_id: i64) -> RepositoryResult<Option<AlertRecord>> {
        let sql = format!("SELECT {} FROM alerts WHERE alert_id = ?1", ALERT_COLUMNS);
        Ok(conn.query_row(&sql, params![alert_id], map_alert_row).optional()?)
    }

    fn find_open_tx(
        conn: &Connection,
        category: AlertCategory,
        ref_key: &str,
    ) -> RepositoryResult<Option<AlertRecord>> {
        let sql = format!(
            "SELECT {} FROM alerts \
             WHERE category = ?1 AND ref_key = ?2 AND status IN {} \
             ORDER BY created_at DESC, alert_id DESC LIMIT 1",
            ALERT_COLUMNS, OPEN_STATUS_SQL
        );
        Ok(conn
            .query_row(&sql, params![category.as_str(), ref_key], map_alert_row)
            .optional()?)
    }

    fn insert_alert_tx(conn: &Connection, alert: &NewAlert) -> RepositoryResult<i64> {
        let now = format_timestamp(&alert.observed_at);
        conn.execute(
            r#"
            INSERT INTO alerts (
                alert_type, category, ref_entity, ref_id, ref_code, ref_key,
                title, message, details, severity, status, created_for,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'new', ?11, ?12, ?12
            )
            "#,
            params![
                alert.alert_type().as_str(),
                alert.category.as_str(),
                alert.reference.ref_entity,
                alert.reference.ref_id,
                alert.reference.ref_code,
                alert.ref_key(),
                alert.title,
                alert.message,
                details_json(alert)?,
                alert.severity.as_str(),
                alert.created_for,
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_alert_tx(conn: &Connection, alert_id: i64, alert: &NewAlert) -> RepositoryResult<()> {
        let changed = conn.execute(
            r#"
            UPDATE alerts SET
                title = ?2,
                message = ?3,
                details = ?4,
                severity = ?5,
                updated_at = ?6
            WHERE alert_id = ?1
            "#,
            params![
                alert_id,
                alert.title,
                alert.message,
                details_json(alert)?,
                alert.severity.as_str(),
                format_timestamp(&alert.observed_at),
            ],
        )?;
        if changed == 0 {
            return Err(alert_not_found(alert_id));
        }
        Ok(())
    }

    fn escalation_level_tx(conn: &Connection, alert_id: i64) -> RepositoryResult<i32> {
        let level: i32 = conn.query_row(
            "SELECT COALESCE(MAX(escalation_level), 0) FROM service_alert_escalations WHERE alert_id = ?1",
            params![alert_id],
            |row| row.get(0),
        )?;
        Ok(level)
    }

    fn insert_escalation_tx(conn: &Connection, record: &EscalationRecord) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO service_alert_escalations (
                alert_id, original_severity, escalated_severity,
                escalation_level, escalated_at, escalated_by, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.alert_id,
                record.original_severity.as_str(),
                record.escalated_severity.as_str(),
                record.escalation_level,
                format_timestamp(&record.created_at),
                record.escalated_by,
                record.notes,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 生命周期状态迁移（resolved 为终态）
    fn transition(&self, alert_id: i64, at: DateTime<Utc>, target: AlertStatus) -> RepositoryResult<AlertRecord> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = Self::find_by_id_tx(&tx, alert_id)?.ok_or_else(|| alert_not_found(alert_id))?;
        if current.status == AlertStatus::Resolved || target == AlertStatus::New {
            return Err(RepositoryError::InvalidStateTransition {
                from: current.status.to_string(),
                to: target.to_string(),
            });
        }

        let sql = match target {
            AlertStatus::Read => {
                "UPDATE alerts SET \
                     status = CASE WHEN status = 'new' THEN 'read' ELSE status END, \
                     read_at = COALESCE(read_at, ?2), updated_at = ?2 \
                 WHERE alert_id = ?1"
            }
            AlertStatus::Acknowledged => {
                "UPDATE alerts SET status = 'acknowledged', \
                     read_at = COALESCE(read_at, ?2), \
                     acknowledged_at = COALESCE(acknowledged_at, ?2), updated_at = ?2 \
                 WHERE alert_id = ?1"
            }
            _ => "UPDATE alerts SET status = 'resolved', resolved_at = ?2, updated_at = ?2 WHERE alert_id = ?1",
        };
        tx.execute(sql, params![alert_id, format_timestamp(&at)])?;

        let updated = Self::find_by_id_tx(&tx, alert_id)?.ok_or_else(|| alert_not_found(alert_id))?;
        tx.commit()?;

        tracing::debug!(alert_id, from = %current.status, to = %updated.status, "告警状态迁移");
        Ok(updated)
    }
}

impl AlertRepository for AlertRepositoryImpl {
    fn find_open_alert(
        &self,
        category: AlertCategory,
        reference: &AlertReference,
    ) -> RepositoryResult<Option<AlertRecord>> {
        let conn = self.get_conn()?;
        Self::find_open_tx(&conn, category, &reference.ref_key())
    }

    fn find_by_id(&self, alert_id: i64) -> RepositoryResult<Option<AlertRecord>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, alert_id)
    }

    fn list_open_alerts(&self) -> RepositoryResult<Vec<AlertRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM alerts WHERE status IN {} ORDER BY created_at DESC, alert_id DESC",
            ALERT_COLUMNS, OPEN_STATUS_SQL
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_alert_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_alert(&self, alert: &NewAlert) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::insert_alert_tx(&conn, alert)
    }

    fn update_alert(&self, alert_id: i64, alert: &NewAlert) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::update_alert_tx(&conn, alert_id, alert)
    }

    fn upsert_open_alert(&self, alert: &NewAlert) -> RepositoryResult<UpsertOutcome> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let outcome = match Self::find_open_tx(&tx, alert.category, &alert.ref_key())? {
            Some(existing) => {
                Self::update_alert_tx(&tx, existing.alert_id, alert)?;
                UpsertOutcome {
                    alert_id: existing.alert_id,
                    created: false,
                }
            }
            None => UpsertOutcome {
                alert_id: Self::insert_alert_tx(&tx, alert)?,
                created: true,
            },
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn escalation_level(&self, alert_id: i64) -> RepositoryResult<i32> {
        let conn = self.get_conn()?;
        Self::escalation_level_tx(&conn, alert_id)
    }

    fn latest_escalation(&self, alert_id: i64) -> RepositoryResult<Option<EscalationRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM service_alert_escalations WHERE alert_id = ?1 \
             ORDER BY escalation_level DESC LIMIT 1",
            ESCALATION_COLUMNS
        );
        Ok(conn.query_row(&sql, params![alert_id], map_escalation_row).optional()?)
    }

    fn list_escalations(&self, alert_id: i64) -> RepositoryResult<Vec<EscalationRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM service_alert_escalations WHERE alert_id = ?1 ORDER BY escalation_level ASC",
            ESCALATION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![alert_id], map_escalation_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_escalation_record(&self, record: &EscalationRecord) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::insert_escalation_tx(&conn, record)
    }

    fn record_escalation(&self, record: &EscalationRecord) -> RepositoryResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = Self::escalation_level_tx(&tx, record.alert_id)?;
        if current + 1 != record.escalation_level {
            tracing::debug!(
                alert_id = record.alert_id,
                current,
                requested = record.escalation_level,
                "升级级别已变化，跳过"
            );
            return Ok(false);
        }

        Self::insert_escalation_tx(&tx, record)?;
        let changed = tx.execute(
            "UPDATE alerts SET severity = ?2, updated_at = ?3 WHERE alert_id = ?1",
            params![
                record.alert_id,
                record.escalated_severity.as_str(),
                format_timestamp(&record.created_at),
            ],
        )?;
        if changed == 0 {
            return Err(alert_not_found(record.alert_id));
        }

        tx.commit()?;
        Ok(true)
    }

    fn mark_read(&self, alert_id: i64, at: DateTime<Utc>) -> RepositoryResult<AlertRecord> {
        self.transition(alert_id, at, AlertStatus::Read)
    }

    fn acknowledge(&self, alert_id: i64, at: DateTime<Utc>) -> RepositoryResult<AlertRecord> {
        self.transition(alert_id, at, AlertStatus::Acknowledged)
    }

    fn resolve(&self, alert_id: i64, at: DateTime<Utc>) -> RepositoryResult<AlertRecord> {
        self.transition(alert_id, at, AlertStatus::Resolved)
    }
}
