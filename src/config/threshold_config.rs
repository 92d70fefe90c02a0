// ==========================================
// ForgeDB 核心 - 告警阈值配置
// ==========================================
// 职责: 阈值值对象（不可变），更新时生成新实例
// 存储: service_alert_thresholds 表（由 ThresholdStore 读写）
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ==========================================
// 阈值键
// ==========================================
pub mod threshold_keys {
    pub const MAX_DELAY_PERCENTAGE: &str = "max_delay_percentage";
    pub const MAX_ORDERS_PER_TECHNICIAN: &str = "max_orders_per_technician";
    pub const TIME_OVERRUN_MULTIPLIER: &str = "time_overrun_multiplier";
    pub const LOW_STOCK_PERCENTAGE: &str = "low_stock_percentage";
    pub const HIGH_PRODUCTIVITY_ORDERS: &str = "high_productivity_orders";
    pub const DELAYED_ORDER_HOURS: &str = "delayed_order_hours";
    pub const ESCALATION_TIME_HOURS: &str = "escalation_time_hours";
    pub const ESCALATION_TIME_CRITICAL_HOURS: &str = "escalation_time_critical_hours";

    pub const ALL: [&str; 8] = [
        MAX_DELAY_PERCENTAGE,
        MAX_ORDERS_PER_TECHNICIAN,
        TIME_OVERRUN_MULTIPLIER,
        LOW_STOCK_PERCENTAGE,
        HIGH_PRODUCTIVITY_ORDERS,
        DELAYED_ORDER_HOURS,
        ESCALATION_TIME_HOURS,
        ESCALATION_TIME_CRITICAL_HOURS,
    ];

    pub fn is_known(key: &str) -> bool {
        ALL.contains(&key)
    }
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("未知的阈值键: {0}")]
    UnknownKey(String),

    #[error("阈值必须为正数 (key={key}, value={value})")]
    InvalidValue { key: String, value: f64 },

    #[error("配置存储失败: {0}")]
    Storage(String),
}

// ==========================================
// ThresholdConfig - 阈值值对象
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub max_delay_percentage: f64,
    pub max_orders_per_technician: f64,
    pub time_overrun_multiplier: f64,
    pub low_stock_percentage: f64,
    pub high_productivity_orders: f64,
    pub delayed_order_hours: f64,
    pub escalation_time_hours: f64,
    pub escalation_time_critical_hours: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            max_delay_percentage: 20.0,
            max_orders_per_technician: 5.0,
            time_overrun_multiplier: 2.0,
            low_stock_percentage: 20.0,
            high_productivity_orders: 3.0,
            delayed_order_hours: 2.0,
            escalation_time_hours: 24.0,
            escalation_time_critical_hours: 4.0,
        }
    }
}

impl ThresholdConfig {
    /// 默认值叠加存储值
    ///
    /// 未知键与非法值跳过（记录 warn），不影响其他键
    pub fn from_map(values: &BTreeMap<String, f64>) -> Self {
        let mut config = Self::default();
        for (key, value) in values {
            if let Err(e) = config.set(key, *value) {
                tracing::warn!(key = %key, value = *value, error = %e, "忽略存储中的阈值");
            }
        }
        config
    }

    /// 生成更新后的新配置（整体校验，任一键非法则不生效）
    pub fn with_updates(&self, updates: &BTreeMap<String, f64>) -> Result<Self, ConfigError> {
        let mut next = self.clone();
        for (key, value) in updates {
            next.set(key, *value)?;
        }
        Ok(next)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        use threshold_keys::*;
        match key {
            MAX_DELAY_PERCENTAGE => Some(self.max_delay_percentage),
            MAX_ORDERS_PER_TECHNICIAN => Some(self.max_orders_per_technician),
            TIME_OVERRUN_MULTIPLIER => Some(self.time_overrun_multiplier),
            LOW_STOCK_PERCENTAGE => Some(self.low_stock_percentage),
            HIGH_PRODUCTIVITY_ORDERS => Some(self.high_productivity_orders),
            DELAYED_ORDER_HOURS => Some(self.delayed_order_hours),
            ESCALATION_TIME_HOURS => Some(self.escalation_time_hours),
            ESCALATION_TIME_CRITICAL_HOURS => Some(self.escalation_time_critical_hours),
            _ => None,
        }
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        threshold_keys::ALL
            .iter()
            .filter_map(|key| self.get(key).map(|v| (key.to_string(), v)))
            .collect()
    }

    fn set(&mut self, key: &str, value: f64) -> Result<(), ConfigError> {
        use threshold_keys::*;
        if !value.is_finite() || value <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            });
        }
        let slot = match key {
            MAX_DELAY_PERCENTAGE => &mut self.max_delay_percentage,
            MAX_ORDERS_PER_TECHNICIAN => &mut self.max_orders_per_technician,
            TIME_OVERRUN_MULTIPLIER => &mut self.time_overrun_multiplier,
            LOW_STOCK_PERCENTAGE => &mut self.low_stock_percentage,
            HIGH_PRODUCTIVITY_ORDERS => &mut self.high_productivity_orders,
            DELAYED_ORDER_HOURS => &mut self.delayed_order_hours,
            ESCALATION_TIME_HOURS => &mut self.escalation_time_hours,
            ESCALATION_TIME_CRITICAL_HOURS => &mut self.escalation_time_critical_hours,
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        };
        *slot = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_defaults() {
        let config = ThresholdConfig::default();
        assert_eq!(config.max_orders_per_technician, 5.0);
        assert_eq!(config.escalation_time_hours, 24.0);
        assert_eq!(config.to_map().len(), 8);
    }

    #[test]
    fn test_with_updates_returns_new_config() {
        let base = ThresholdConfig::default();
        let next = base
            .with_updates(&map(&[("escalation_time_hours", 12.0)]))
            .unwrap();
        assert_eq!(next.escalation_time_hours, 12.0);
        assert_eq!(base.escalation_time_hours, 24.0);
    }

    #[test]
    fn test_with_updates_rejects_whole_batch() {
        let base = ThresholdConfig::default();
        let err = base
            .with_updates(&map(&[("delayed_order_hours", 3.0), ("bogus", 1.0)]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));

        let err = base
            .with_updates(&map(&[("low_stock_percentage", -5.0)]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_from_map_skips_bad_entries() {
        let config = ThresholdConfig::from_map(&map(&[
            ("max_orders_per_technician", 8.0),
            ("unknown_key", 3.0),
            ("delayed_order_hours", 0.0),
        ]));
        assert_eq!(config.max_orders_per_technician, 8.0);
        assert_eq!(config.delayed_order_hours, 2.0);
    }
}
