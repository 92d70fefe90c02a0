// ==========================================
// ForgeDB 核心 - 配置管理器
// ==========================================
// 职责: 告警阈值读写、报价默认值读取
// 存储: service_alert_thresholds 表 + config_kv 表 (key-value + scope)
// ==========================================

use crate::config::threshold_config::{threshold_keys, ConfigError};
use crate::config::threshold_store_trait::ThresholdStore;
use crate::db::{format_timestamp, open_sqlite_connection};
use chrono::Utc;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    /// 报价默认税率 (%)
    pub const QUOTE_DEFAULT_TAX_PERCENT: &str = "quote.default_tax_percent";
    /// 报价默认工时单价
    pub const QUOTE_DEFAULT_HOURLY_RATE: &str = "quote.default_hourly_rate";
}

/// 报价默认值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingDefaults {
    pub tax_percent: Decimal,
    pub hourly_rate: Decimal,
}

impl Default for PricingDefaults {
    fn default() -> Self {
        Self {
            tax_percent: Decimal::new(1600, 2),
            hourly_rate: Decimal::new(50000, 2),
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, ConfigError> {
        let conn = open_sqlite_connection(db_path).map_err(storage)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, ConfigError> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| ConfigError::Storage(format!("锁获取失败: {}", e)))?;
            crate::db::configure_sqlite_connection(&conn_guard).map_err(storage)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> Result<MutexGuard<'_, Connection>, ConfigError> {
        self.conn
            .lock()
            .map_err(|e| ConfigError::Storage(format!("锁获取失败: {}", e)))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let conn = self.get_conn()?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(storage(e)),
        }
    }

    /// 写入 global scope 配置值（覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, ?3)
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value, format_timestamp(&Utc::now())],
        )
        .map_err(storage)?;
        Ok(())
    }

    /// 读取报价默认值
    ///
    /// 缺失或无法解析时回退默认值（16.00% / 500.00）
    pub fn get_pricing_defaults(&self) -> Result<PricingDefaults, ConfigError> {
        let defaults = PricingDefaults::default();
        Ok(PricingDefaults {
            tax_percent: self.decimal_or(config_keys::QUOTE_DEFAULT_TAX_PERCENT, defaults.tax_percent)?,
            hourly_rate: self.decimal_or(config_keys::QUOTE_DEFAULT_HOURLY_RATE, defaults.hourly_rate)?,
        })
    }

    fn decimal_or(&self, key: &str, default: Decimal) -> Result<Decimal, ConfigError> {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(default);
        };
        match Decimal::from_str(raw.trim()) {
            Ok(v) if v >= Decimal::ZERO => Ok(v),
            _ => {
                tracing::warn!(key = %key, value = %raw, "配置值无法解析，使用默认值");
                Ok(default)
            }
        }
    }
}

impl ThresholdStore for ConfigManager {
    fn read_active_thresholds(&self) -> Result<BTreeMap<String, f64>, ConfigError> {
        let conn = self.get_conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT threshold_key, value FROM service_alert_thresholds \
                 WHERE is_active = 1 ORDER BY threshold_key",
            )
            .map_err(storage)?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))
            .map_err(storage)?;

        let mut values = BTreeMap::new();
        for row in rows {
            let (key, value) = row.map_err(storage)?;
            if !threshold_keys::is_known(&key) {
                tracing::warn!(key = %key, "未知的阈值键，已忽略");
                continue;
            }
            values.insert(key, value);
        }
        Ok(values)
    }

    fn upsert_threshold(&self, key: &str, value: f64, updated_by: Option<i64>) -> Result<(), ConfigError> {
        let now = format_timestamp(&Utc::now());
        let (name, unit, category) = threshold_meta(key);
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO service_alert_thresholds (
                threshold_key, threshold_name, value, unit, category,
                is_active, created_at, updated_at, updated_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6, ?7)
            ON CONFLICT(threshold_key) DO UPDATE SET
                value = excluded.value,
                is_active = 1,
                updated_at = excluded.updated_at,
                updated_by = excluded.updated_by
            "#,
            params![key, name, value, unit, category, now, updated_by],
        )
        .map_err(storage)?;
        Ok(())
    }
}

/// (显示名, 单位, 分组)
fn threshold_meta(key: &str) -> (&'static str, Option<&'static str>, &'static str) {
    use threshold_keys::*;
    match key {
        MAX_DELAY_PERCENTAGE => ("Retraso máximo permitido", Some("%"), "work_orders"),
        MAX_ORDERS_PER_TECHNICIAN => ("Órdenes máximas por técnico", Some("orders"), "technicians"),
        TIME_OVERRUN_MULTIPLIER => ("Multiplicador de exceso de tiempo", Some("x"), "work_orders"),
        LOW_STOCK_PERCENTAGE => ("Porcentaje de stock bajo", Some("%"), "inventory"),
        HIGH_PRODUCTIVITY_ORDERS => ("Órdenes para alta productividad", Some("orders"), "technicians"),
        DELAYED_ORDER_HOURS => ("Horas para orden retrasada", Some("hours"), "work_orders"),
        ESCALATION_TIME_HOURS => ("Horas para escalamiento", Some("hours"), "escalation"),
        ESCALATION_TIME_CRITICAL_HOURS => ("Horas para escalamiento crítico", Some("hours"), "escalation"),
        _ => ("", None, "general"),
    }
}

fn storage(err: rusqlite::Error) -> ConfigError {
    ConfigError::Storage(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::apply_schema;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_threshold_upsert_and_read() {
        let mgr = manager();
        assert!(mgr.read_active_thresholds().unwrap().is_empty());

        mgr.upsert_threshold("escalation_time_hours", 12.0, Some(7)).unwrap();
        mgr.upsert_threshold("escalation_time_hours", 10.0, None).unwrap();

        let values = mgr.read_active_thresholds().unwrap();
        assert_eq!(values.get("escalation_time_hours"), Some(&10.0));
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_inactive_and_unknown_rows_ignored() {
        let mgr = manager();
        {
            let conn = mgr.get_conn().unwrap();
            conn.execute_batch(
                "INSERT INTO service_alert_thresholds \
                 (threshold_key, threshold_name, value, is_active, created_at, updated_at) VALUES \
                 ('delayed_order_hours', 'x', 6, 0, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z'), \
                 ('legacy_key', 'x', 1, 1, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z');",
            )
            .unwrap();
        }
        assert!(mgr.read_active_thresholds().unwrap().is_empty());
    }

    #[test]
    fn test_pricing_defaults_fallback() {
        let mgr = manager();
        assert_eq!(mgr.get_pricing_defaults().unwrap(), PricingDefaults::default());

        mgr.set_global_config_value(config_keys::QUOTE_DEFAULT_TAX_PERCENT, "8.00")
            .unwrap();
        mgr.set_global_config_value(config_keys::QUOTE_DEFAULT_HOURLY_RATE, "abc")
            .unwrap();

        let pricing = mgr.get_pricing_defaults().unwrap();
        assert_eq!(pricing.tax_percent, Decimal::new(800, 2));
        assert_eq!(pricing.hourly_rate, Decimal::new(50000, 2));
    }
}
