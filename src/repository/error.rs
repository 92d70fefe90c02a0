// ==========================================
// ForgeDB 核心 - 仓储层错误类型
// ==========================================
// SQLite 失败按错误码分类:
// - 约束冲突: 开放告警唯一索引 / 升级层级唯一约束 / 外键
// - BUSY / LOCKED: 并发写入（IMMEDIATE 事务竞争）
// ==========================================

use rusqlite::ffi;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    /// 连接互斥锁中毒或 SQLite 表锁
    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    /// IMMEDIATE 事务等待超过 busy_timeout
    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    /// 告警生命周期迁移不合法（resolved 为终态）
    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    /// 存储值无法映射为领域类型（例如未知的严重度字符串）
    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, msg) => {
                let detail = msg.unwrap_or_else(|| code.to_string());
                match (code.code, code.extended_code) {
                    (_, ffi::SQLITE_CONSTRAINT_UNIQUE) | (_, ffi::SQLITE_CONSTRAINT_PRIMARYKEY) => {
                        RepositoryError::UniqueConstraintViolation(detail)
                    }
                    (_, ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => RepositoryError::ForeignKeyViolation(detail),
                    (ffi::ErrorCode::DatabaseBusy, _) => RepositoryError::DatabaseTransactionError(detail),
                    (ffi::ErrorCode::DatabaseLocked, _) => RepositoryError::LockError(detail),
                    (ffi::ErrorCode::CannotOpen, _) => RepositoryError::DatabaseConnectionError(detail),
                    _ => RepositoryError::DatabaseQueryError(detail),
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            rusqlite::Error::FromSqlConversionFailure(idx, _, cause) => RepositoryError::FieldValueError {
                field: format!("column#{}", idx),
                message: cause.to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_no_rows_maps_to_not_found() {
        let err: RepositoryError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_constraint_codes() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE parent (id INTEGER PRIMARY KEY, code TEXT UNIQUE);
             CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER REFERENCES parent(id));
             INSERT INTO parent (id, code) VALUES (1, 'A');",
        )
        .unwrap();

        let dup: RepositoryError = conn
            .execute("INSERT INTO parent (id, code) VALUES (2, 'A')", [])
            .unwrap_err()
            .into();
        assert!(matches!(dup, RepositoryError::UniqueConstraintViolation(_)));

        let orphan: RepositoryError = conn
            .execute("INSERT INTO child (id, parent_id) VALUES (1, 99)", [])
            .unwrap_err()
            .into();
        assert!(matches!(orphan, RepositoryError::ForeignKeyViolation(_)));
    }

    #[test]
    fn test_display_contains_field() {
        let err = RepositoryError::FieldValueError {
            field: "severity".to_string(),
            message: "bogus".to_string(),
        };
        assert!(err.to_string().contains("severity"));
    }
}
