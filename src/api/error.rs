// ==========================================
// ForgeDB 核心 - API层错误类型
// ==========================================
// 职责: 汇总仓储 / 报价输入 / 配置错误，转换为调用方可展示的错误消息
// ==========================================

use crate::config::ConfigError;
use crate::domain::quote::QuoteError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    /// 报价业务规则校验未通过（携带全部错误信息）
    #[error("数据验证失败: {}", .errors.join("; "))]
    ValidationError {
        errors: Vec<String>,
        warnings: Vec<String>,
    },

    // ==========================================
    // 配置错误
    // ==========================================
    #[error("配置错误: {0}")]
    ConfigError(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 QuoteError 转换
// ==========================================
impl From<QuoteError> for ApiError {
    fn from(err: QuoteError) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

// ==========================================
// 从 ConfigError 转换
// ==========================================
impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Storage(msg) => ApiError::DatabaseError(msg),
            other => ApiError::ConfigError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "Alert".to_string(),
            id: "42".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Alert"));
                assert!(msg.contains("42"));
            }
            _ => panic!("Expected NotFound"),
        }

        let api_err: ApiError = RepositoryError::InvalidStateTransition {
            from: "resolved".to_string(),
            to: "read".to_string(),
        }
        .into();
        assert!(matches!(api_err, ApiError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_constraint_violations_map_to_business_rule() {
        let api_err: ApiError = RepositoryError::UniqueConstraintViolation("alerts.ref_key".to_string()).into();
        match api_err {
            ApiError::BusinessRuleViolation(msg) => assert!(msg.contains("唯一约束")),
            other => panic!("Expected BusinessRuleViolation, got {:?}", other),
        }

        let api_err: ApiError = RepositoryError::ForeignKeyViolation("alert_id".to_string()).into();
        assert!(matches!(api_err, ApiError::BusinessRuleViolation(_)));
    }

    #[test]
    fn test_quote_error_conversion() {
        let api_err: ApiError = QuoteError::InvalidNumber {
            field: "hours".to_string(),
            value: "abc".to_string(),
        }
        .into();
        match api_err {
            ApiError::InvalidInput(msg) => assert!(msg.contains("hours")),
            _ => panic!("Expected InvalidInput"),
        }

        let api_err: ApiError = QuoteError::Overflow {
            field: "subtotal".to_string(),
        }
        .into();
        assert!(matches!(api_err, ApiError::InvalidInput(msg) if msg.contains("subtotal")));
    }

    #[test]
    fn test_config_error_conversion() {
        let api_err: ApiError = ConfigError::UnknownKey("foo".to_string()).into();
        assert!(matches!(api_err, ApiError::ConfigError(_)));

        let api_err: ApiError = ConfigError::Storage("disk".to_string()).into();
        assert!(matches!(api_err, ApiError::DatabaseError(_)));
    }

    #[test]
    fn test_validation_error_display_joins_messages() {
        let err = ApiError::ValidationError {
            errors: vec!["a".to_string(), "b".to_string()],
            warnings: vec![],
        };
        assert!(err.to_string().contains("a; b"));
    }
}
