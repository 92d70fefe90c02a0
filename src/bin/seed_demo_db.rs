// ==========================================
// ForgeDB 核心 - 演示数据库生成
// ==========================================
// 用法: seed_demo_db [db_path]
// 生成后每类告警至少触发一条:
// - 延误工单 (critical / high / medium)
// - 技术员超负荷 + 未分派工单
// - 售罄 / 低库存
// - 异常工时 + 当日高产出
// ==========================================

use chrono::{Duration, Local, Utc};
use rusqlite::{params, Connection};
use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use forge_core::config::{config_keys, ConfigManager, ThresholdConfig, ThresholdStore};
use forge_core::db::{apply_schema, format_timestamp, get_default_db_path, open_sqlite_connection};

const TECHNICIANS: [(i64, &str); 4] = [
    (1, "Ana Torres"),
    (2, "Luis Medina"),
    (3, "Carla Ruiz"),
    (4, "Jorge Peña"),
];

fn main() -> Result<(), Box<dyn Error>> {
    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);

    backup_and_reset_db(&db_path)?;

    let conn = open_sqlite_connection(&db_path)?;
    apply_schema(&conn)?;

    seed_technicians(&conn)?;
    seed_work_orders(&conn)?;
    seed_stock(&conn)?;

    let conn = Arc::new(Mutex::new(conn));
    seed_config(conn.clone())?;

    print_quick_counts(&conn)?;
    eprintln!("Demo database ready: {}", db_path);
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn seed_technicians(conn: &Connection) -> Result<(), Box<dyn Error>> {
    for (id, name) in TECHNICIANS {
        conn.execute(
            "INSERT INTO technicians (technician_id, name, is_active) VALUES (?1, ?2, 1)",
            params![id, name],
        )?;
    }
    // 停用的技术员不参与超负荷检测
    conn.execute(
        "INSERT INTO technicians (technician_id, name, is_active) VALUES (5, 'Pedro Gil', 0)",
        [],
    )?;
    Ok(())
}

fn seed_work_orders(conn: &Connection) -> Result<(), Box<dyn Error>> {
    let now = Utc::now();
    let today = now.date_naive();
    let mut next_id = 1000_i64;
    let mut insert = |status: &str,
                      technician: Option<i64>,
                      eta_offset_hours: Option<i64>,
                      estimated: Option<f64>,
                      actual: Option<f64>,
                      completed_days_ago: Option<i64>|
     -> rusqlite::Result<()> {
        next_id += 1;
        let eta = eta_offset_hours.map(|h| format_timestamp(&(now + Duration::hours(h))));
        let completed = completed_days_ago.map(|d| (today - Duration::days(d)).format("%Y-%m-%d").to_string());
        conn.execute(
            r#"
            INSERT INTO work_orders (
                wo_id, wo_number, status, primary_technician_id,
                estimated_completion_date, estimated_hours, actual_hours, completed_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                next_id,
                format!("OT-{}", next_id),
                status,
                technician,
                eta,
                estimated,
                actual,
                completed
            ],
        )?;
        Ok(())
    };

    // 延误工单: 12h (critical) / 6h (high) / 3h 且工时占比低 (medium)
    insert("in_progress", Some(1), Some(-12), Some(40.0), None, None)?;
    insert("in_progress", Some(2), Some(-6), Some(40.0), None, None)?;
    insert("in_progress", Some(3), Some(-3), Some(40.0), None, None)?;
    // 未到期
    insert("in_progress", Some(4), Some(24), Some(8.0), None, None)?;

    // 技术员 1 超负荷（活动工单 > 5）
    for _ in 0..5 {
        insert("scheduled", Some(1), Some(48), Some(4.0), None, None)?;
    }

    // 未分派
    for _ in 0..3 {
        insert("scheduled", None, Some(72), Some(2.0), None, None)?;
    }

    // 异常工时（实际 > 预计 × 2）
    insert("completed", Some(2), None, Some(4.0), Some(9.5), Some(2))?;
    insert("completed", Some(3), None, Some(2.0), Some(5.0), Some(5))?;
    // 超出回看窗口
    insert("completed", Some(3), None, Some(2.0), Some(6.0), Some(20))?;

    // 技术员 4 当日完工 3 单
    for _ in 0..3 {
        insert("completed", Some(4), None, Some(2.0), Some(2.0), Some(0))?;
    }

    // 已取消的工单不参与检测
    insert("cancelled", None, Some(-100), Some(1.0), None, None)?;
    Ok(())
}

fn seed_stock(conn: &Connection) -> Result<(), Box<dyn Error>> {
    let rows: [(&str, &str, &str, f64, f64); 6] = [
        ("FLT-001", "Filtro de aceite", "Central", 0.0, 10.0),
        ("BAL-014", "Balata delantera", "Central", 0.0, 4.0),
        ("BUJ-220", "Bujía iridio", "Norte", 1.0, 20.0),
        ("ACE-5W30", "Aceite 5W-30", "Central", 3.0, 30.0),
        ("LIM-010", "Limpiaparabrisas", "Norte", 8.0, 10.0),
        ("REF-777", "Refrigerante", "Central", 50.0, 10.0),
    ];
    for (code, name, warehouse, qty, min_qty) in rows {
        conn.execute(
            r#"
            INSERT INTO stock (product_code, product_name, warehouse_name, quantity, min_quantity)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![code, name, warehouse, qty, min_qty],
        )?;
    }
    Ok(())
}

fn seed_config(conn: Arc<Mutex<Connection>>) -> Result<(), Box<dyn Error>> {
    let manager = ConfigManager::from_connection(conn)?;
    for (key, value) in ThresholdConfig::default().to_map() {
        manager.upsert_threshold(&key, value, None)?;
    }
    manager.set_global_config_value(config_keys::QUOTE_DEFAULT_TAX_PERCENT, "16.00")?;
    manager.set_global_config_value(config_keys::QUOTE_DEFAULT_HOURLY_RATE, "500.00")?;
    Ok(())
}

fn print_quick_counts(conn: &Arc<Mutex<Connection>>) -> Result<(), Box<dyn Error>> {
    let conn = conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
    for table in ["technicians", "work_orders", "stock", "service_alert_thresholds"] {
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        eprintln!("{:<28} {}", table, count);
    }
    Ok(())
}
