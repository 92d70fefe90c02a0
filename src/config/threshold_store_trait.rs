// ==========================================
// ForgeDB 核心 - 阈值存储 Trait
// ==========================================
// 职责: 定义告警阈值的持久化读写接口（不包含实现）
// 红线: 不包含阈值校验，不包含业务逻辑
// ==========================================

use crate::config::threshold_config::ConfigError;
use std::collections::BTreeMap;

// ==========================================
// ThresholdStore Trait
// ==========================================
// 实现者: ConfigManager（service_alert_thresholds 表）
pub trait ThresholdStore: Send + Sync {
    /// 读取启用中的阈值
    ///
    /// # 返回
    /// - key → value；停用 (is_active = 0) 的行不返回
    fn read_active_thresholds(&self) -> Result<BTreeMap<String, f64>, ConfigError>;

    /// 写入/覆盖单个阈值
    ///
    /// # 参数
    /// - key: 阈值键
    /// - value: 阈值
    /// - updated_by: 操作人（可选）
    fn upsert_threshold(&self, key: &str, value: f64, updated_by: Option<i64>) -> Result<(), ConfigError>;
}
