// ==========================================
// ForgeDB 核心 - 应用状态
// ==========================================
// 职责: 组装共享连接、仓储、引擎与 API 实例
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{AlertApi, QuoteApi};
use crate::config::{ConfigManager, PricingDefaults};
use crate::db::{apply_schema, open_sqlite_connection};
use crate::engine::{QuoteCalculationEngine, ServiceAlertEngine};
use crate::repository::{AlertRepositoryImpl, OperationsRepositoryImpl};

/// 应用状态
///
/// 所有仓储共享同一数据库连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 报价API
    pub quote_api: Arc<QuoteApi>,

    /// 服务告警API
    pub alert_api: Arc<AlertApi>,

    /// 配置管理器（阈值 / 报价默认值）
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（不存在时创建并建表）
    /// - user_id: 操作人（写入升级记录与阈值更新人）
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: &str, user_id: Option<i64>) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        let mut state = Self::from_connection(conn, user_id)?;
        state.db_path = db_path.to_string();
        Ok(state)
    }

    /// 基于已打开的连接创建（测试可传入内存库）
    pub fn from_connection(conn: Connection, user_id: Option<i64>) -> Result<Self, String> {
        apply_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let operations_repo = Arc::new(OperationsRepositoryImpl::from_connection(conn.clone()));
        let alert_repo = Arc::new(AlertRepositoryImpl::from_connection(conn.clone()));
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let pricing = config_manager.get_pricing_defaults().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "报价默认值读取失败，使用内置默认值");
            PricingDefaults::default()
        });
        let quote_engine = QuoteCalculationEngine::with_pricing(pricing);
        let alert_engine = ServiceAlertEngine::load(operations_repo, alert_repo.clone(), config_manager.clone())
            .with_user_id(user_id);

        // ==========================================
        // 初始化API层
        // ==========================================
        let quote_api = Arc::new(QuoteApi::new(quote_engine));
        let alert_api = Arc::new(AlertApi::new(alert_engine, alert_repo));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path: String::new(),
            quote_api,
            alert_api,
            config_manager,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_state_from_memory_connection() {
        crate::i18n::init();
        let conn = Connection::open_in_memory().unwrap();
        let state = AppState::from_connection(conn, Some(7)).unwrap();

        let preview = state
            .quote_api
            .preview_quote(&json!({"items": [{"hours": 1}]}))
            .unwrap();
        assert_eq!(preview.totals.subtotal, dec!(500.00));

        let response = state.alert_api.get_alerts(None, None).unwrap();
        assert!(response.alerts.is_empty());
        assert_eq!(response.stats.total, 0);
    }
}
