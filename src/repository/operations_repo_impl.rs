// ==========================================
// ForgeDB 核心 - 运营数据 Repository 实现
// ==========================================
// 职责: 工单 / 库存 / 技术员只读查询（使用 rusqlite）
// 约定: 可选列无法解析时视为缺失，不报错
// ==========================================

use crate::db::{open_sqlite_connection, parse_timestamp};
use crate::domain::operations::{StockRecord, Technician, WorkOrder};
use crate::domain::types::WorkOrderStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::operations_repo::{OperationsRepository, WorkOrderFilter};
use chrono::NaiveDate;
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{params_from_iter, Connection, Row};
use std::sync::{Arc, Mutex, MutexGuard};

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn map_work_order_row(row: &Row) -> rusqlite::Result<WorkOrder> {
    let status: String = row.get(2)?;
    let status = status
        .parse::<WorkOrderStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?;

    // 仅日期的预计完成时间按当日 00:00 UTC 处理
    let eta: Option<String> = row.get(4)?;
    let estimated_completion_date = eta.as_deref().and_then(|raw| {
        parse_timestamp(raw).or_else(|| {
            parse_date(raw)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
    });

    let completed: Option<String> = row.get(7)?;

    Ok(WorkOrder {
        id: row.get(0)?,
        wo_number: row.get(1)?,
        status,
        primary_technician_id: row.get(3)?,
        estimated_completion_date,
        estimated_hours: row.get(5)?,
        actual_hours: row.get(6)?,
        completed_date: completed.as_deref().and_then(parse_date),
    })
}

// ==========================================
// OperationsRepositoryImpl
// ==========================================
pub struct OperationsRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl OperationsRepositoryImpl {
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
}

impl OperationsRepository for OperationsRepositoryImpl {
    fn list_work_orders(&self, filter: &WorkOrderFilter) -> RepositoryResult<Vec<WorkOrder>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        if !filter.statuses.is_empty() {
            let placeholders: Vec<String> = filter
                .statuses
                .iter()
                .map(|status| {
                    values.push(SqlValue::Text(status.as_str().to_string()));
                    format!("?{}", values.len())
                })
                .collect();
            clauses.push(format!("status IN ({})", placeholders.join(", ")));
        }
        if let Some(since) = filter.completed_since {
            values.push(SqlValue::Text(since.format("%Y-%m-%d").to_string()));
            clauses.push(format!(
                "completed_date IS NOT NULL AND substr(completed_date, 1, 10) >= ?{}",
                values.len()
            ));
        }
        if let Some(technician_id) = filter.technician_id {
            values.push(SqlValue::Integer(technician_id));
            clauses.push(format!("primary_technician_id = ?{}", values.len()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT wo_id, wo_number, status, primary_technician_id, estimated_completion_date, \
             estimated_hours, actual_hours, completed_date \
             FROM work_orders {} ORDER BY wo_id LIMIT {}",
            where_sql, filter.page_size
        );

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), map_work_order_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn list_stock(&self, low_stock_only: bool) -> RepositoryResult<Vec<StockRecord>> {
        let sql = if low_stock_only {
            "SELECT product_code, product_name, warehouse_name, quantity, min_quantity FROM stock \
             WHERE COALESCE(quantity, 0) <= COALESCE(min_quantity, 0) ORDER BY stock_id"
        } else {
            "SELECT product_code, product_name, warehouse_name, quantity, min_quantity FROM stock \
             ORDER BY stock_id"
        };

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(StockRecord {
                product_code: row.get(0)?,
                product_name: row.get(1)?,
                warehouse_name: row.get(2)?,
                quantity: row.get(3)?,
                min_quantity: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn list_technicians(&self, active_only: bool) -> RepositoryResult<Vec<Technician>> {
        let sql = if active_only {
            "SELECT technician_id, name, is_active FROM technicians WHERE is_active = 1 ORDER BY technician_id"
        } else {
            "SELECT technician_id, name, is_active FROM technicians ORDER BY technician_id"
        };

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(Technician {
                id: row.get(0)?,
                name: row.get(1)?,
                is_active: row.get::<_, i64>(2)? != 0,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::apply_schema;

    fn repo() -> OperationsRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO technicians (technician_id, name, is_active) VALUES (1, 'Ana', 1), (2, 'Luis', 0);
            INSERT INTO work_orders (wo_id, wo_number, status, primary_technician_id,
                estimated_completion_date, estimated_hours, actual_hours, completed_date) VALUES
                (10, 'WO-10', 'in_progress', 1, '2026-03-01T08:00:00Z', 4, NULL, NULL),
                (11, 'WO-11', 'scheduled', NULL, '2026-03-02', NULL, NULL, NULL),
                (12, 'WO-12', 'completed', 1, 'garbage', 2, 5, '2026-02-27 16:30:00'),
                (13, NULL, 'completed', 1, NULL, 2, 2, '2026-01-01');
            INSERT INTO stock (product_code, product_name, warehouse_name, quantity, min_quantity) VALUES
                ('P-1', 'Filtro', 'Central', 0, 10),
                ('P-2', 'Aceite', 'Central', 50, 10),
                (NULL, NULL, NULL, NULL, 5);
            "#,
        )
        .unwrap();
        OperationsRepositoryImpl::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_filter_by_status_and_technician() {
        let repo = repo();
        let active = repo
            .list_work_orders(&WorkOrderFilter::with_statuses(&WorkOrderStatus::ACTIVE))
            .unwrap();
        assert_eq!(active.iter().map(|w| w.id).collect::<Vec<_>>(), vec![10, 11]);
        assert!(active[1].primary_technician_id.is_none());
        assert!(active[1].estimated_completion_date.is_some());

        let mine = repo
            .list_work_orders(&WorkOrderFilter::default().for_technician(1))
            .unwrap();
        assert_eq!(mine.len(), 3);
    }

    #[test]
    fn test_completed_since_and_lenient_columns() {
        let repo = repo();
        let since = NaiveDate::from_ymd_opt(2026, 2, 22).unwrap();
        let done = repo
            .list_work_orders(
                &WorkOrderFilter::with_statuses(&[WorkOrderStatus::Completed]).completed_since(since),
            )
            .unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, 12);
        assert!(done[0].estimated_completion_date.is_none());
        assert_eq!(done[0].completed_date, NaiveDate::from_ymd_opt(2026, 2, 27));
    }

    #[test]
    fn test_stock_and_technicians() {
        let repo = repo();
        assert_eq!(repo.list_stock(false).unwrap().len(), 3);
        let low = repo.list_stock(true).unwrap();
        assert_eq!(low.len(), 2);
        assert_eq!(low[1].name(), "Producto desconocido");

        assert_eq!(repo.list_technicians(true).unwrap().len(), 1);
        assert_eq!(repo.list_technicians(false).unwrap().len(), 2);
    }
}
