// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库（已建表）与运营数据写入
// ==========================================

#![allow(dead_code)]

use std::error::Error;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use forge_core::db::{apply_schema, format_timestamp, open_sqlite_connection};
use rusqlite::{params, Connection};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是 UTF-8")?
        .to_string();

    let conn = open_sqlite_connection(&db_path)?;
    apply_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开共享连接（与仓储共用）
pub fn open_shared(db_path: &str) -> Result<Arc<Mutex<Connection>>, Box<dyn Error>> {
    let conn = open_sqlite_connection(db_path)?;
    Ok(Arc::new(Mutex::new(conn)))
}

pub fn insert_technician(conn: &Connection, id: i64, name: &str, active: bool) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO technicians (technician_id, name, is_active) VALUES (?1, ?2, ?3)",
        params![id, name, active as i64],
    )?;
    Ok(())
}

/// 写入工单
#[allow(clippy::too_many_arguments)]
pub fn insert_work_order(
    conn: &Connection,
    id: i64,
    status: &str,
    technician_id: Option<i64>,
    eta: Option<DateTime<Utc>>,
    estimated_hours: Option<f64>,
    actual_hours: Option<f64>,
    completed_date: Option<NaiveDate>,
) -> rusqlite::Result<()> {
    conn.execute(
        r#"
        INSERT INTO work_orders (
            wo_id, wo_number, status, primary_technician_id,
            estimated_completion_date, estimated_hours, actual_hours, completed_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            id,
            format!("WO-{}", id),
            status,
            technician_id,
            eta.map(|ts| format_timestamp(&ts)),
            estimated_hours,
            actual_hours,
            completed_date.map(|d| d.format("%Y-%m-%d").to_string()),
        ],
    )?;
    Ok(())
}

pub fn insert_stock(conn: &Connection, code: &str, quantity: f64, min_quantity: f64) -> rusqlite::Result<()> {
    conn.execute(
        r#"
        INSERT INTO stock (product_code, product_name, warehouse_name, quantity, min_quantity)
        VALUES (?1, ?2, 'Central', ?3, ?4)
        "#,
        params![code, format!("Producto {}", code), quantity, min_quantity],
    )?;
    Ok(())
}
