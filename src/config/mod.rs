// ==========================================
// ForgeDB 核心 - 配置层
// ==========================================
// 职责: 告警阈值、报价默认值
// 存储: service_alert_thresholds 表 / config_kv 表
// ==========================================

pub mod config_manager;
pub mod threshold_config;
pub mod threshold_store_trait;

pub use config_manager::{config_keys, ConfigManager, PricingDefaults};
pub use threshold_config::{threshold_keys, ConfigError, ThresholdConfig};
pub use threshold_store_trait::ThresholdStore;
