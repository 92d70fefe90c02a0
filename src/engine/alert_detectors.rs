// ==========================================
// ForgeDB 核心 - 告警检测器
// ==========================================
// 职责: 按类别从运营数据中识别异常，输出 RawAlert
// 输入: OperationsRepository + ThresholdConfig + 当前时间
// 输出: Vec<RawAlert>（未持久化、未升级）
// ==========================================
// 红线: 检测器不写库；数据源错误原样返回，由引擎按类别隔离
// ==========================================

use crate::config::ThresholdConfig;
use crate::domain::alert::{AlertReference, RawAlert};
use crate::domain::operations::{Technician, WorkOrder};
use crate::domain::types::{AlertCategory, Severity, WorkOrderStatus};
use crate::i18n::t_with_args;
use crate::repository::error::RepositoryResult;
use crate::repository::operations_repo::{OperationsRepository, WorkOrderFilter};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// 聚合告警中列出的条目上限
pub const STOCK_LISTING_LIMIT: usize = 5;
pub const ANOMALOUS_LISTING_LIMIT: usize = 5;
pub const UNASSIGNED_LISTING_LIMIT: usize = 10;

/// 异常工时回看天数
pub const ANOMALOUS_LOOKBACK_DAYS: i64 = 7;

// ==========================================
// Detector - 检测策略（封闭枚举）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Detector {
    DelayedOrders,
    LowStock,
    OverloadedTechnicians,
    AnomalousServices,
    HighProductivity,
    UnassignedOrders,
}

impl Detector {
    /// 注册表（执行顺序）
    pub const REGISTRY: [Detector; 6] = [
        Detector::DelayedOrders,
        Detector::LowStock,
        Detector::OverloadedTechnicians,
        Detector::AnomalousServices,
        Detector::HighProductivity,
        Detector::UnassignedOrders,
    ];

    pub fn for_category(category: AlertCategory) -> Self {
        match category {
            AlertCategory::DelayedOrders => Detector::DelayedOrders,
            AlertCategory::LowStock => Detector::LowStock,
            AlertCategory::OverloadedTechnicians => Detector::OverloadedTechnicians,
            AlertCategory::AnomalousServices => Detector::AnomalousServices,
            AlertCategory::HighProductivity => Detector::HighProductivity,
            AlertCategory::UnassignedOrders => Detector::UnassignedOrders,
        }
    }

    pub fn category(&self) -> AlertCategory {
        match self {
            Detector::DelayedOrders => AlertCategory::DelayedOrders,
            Detector::LowStock => AlertCategory::LowStock,
            Detector::OverloadedTechnicians => AlertCategory::OverloadedTechnicians,
            Detector::AnomalousServices => AlertCategory::AnomalousServices,
            Detector::HighProductivity => AlertCategory::HighProductivity,
            Detector::UnassignedOrders => AlertCategory::UnassignedOrders,
        }
    }

    /// 执行检测
    ///
    /// # 参数
    /// - operations: 运营数据源
    /// - thresholds: 阈值
    /// - now: 检测时刻
    pub fn detect(
        &self,
        operations: &dyn OperationsRepository,
        thresholds: &ThresholdConfig,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Vec<RawAlert>> {
        match self {
            Detector::DelayedOrders => detect_delayed_orders(operations, thresholds, now),
            Detector::LowStock => detect_low_stock(operations, thresholds, now),
            Detector::OverloadedTechnicians => detect_overloaded_technicians(operations, thresholds, now),
            Detector::AnomalousServices => detect_anomalous_services(operations, thresholds, now),
            Detector::HighProductivity => detect_high_productivity(operations, thresholds, now),
            Detector::UnassignedOrders => detect_unassigned_orders(operations, now),
        }
    }
}

// ==========================================
// 1. 延误工单
// ==========================================
// 进行中且超过预计完成时间 delayed_order_hours 小时
fn detect_delayed_orders(
    operations: &dyn OperationsRepository,
    thresholds: &ThresholdConfig,
    now: DateTime<Utc>,
) -> RepositoryResult<Vec<RawAlert>> {
    let work_orders =
        operations.list_work_orders(&WorkOrderFilter::with_statuses(&[WorkOrderStatus::InProgress]))?;

    let mut alerts = Vec::new();
    for wo in &work_orders {
        let Some(eta) = wo.estimated_completion_date else {
            continue;
        };

        let delay_hours = (now - eta).num_milliseconds() as f64 / 3_600_000.0;
        if delay_hours <= thresholds.delayed_order_hours {
            continue;
        }

        let estimated_hours = wo.estimated_hours.unwrap_or(0.0);
        let delay_percentage = if estimated_hours > 0.0 {
            delay_hours / estimated_hours * 100.0
        } else {
            0.0
        };

        let severity = if delay_hours > 8.0 || delay_percentage > 50.0 {
            Severity::Critical
        } else if delay_hours > 4.0 || delay_percentage > 30.0 {
            Severity::High
        } else {
            Severity::Medium
        };

        let wo_number = wo.display_number();
        let hours_text = format!("{:.1}", delay_hours);
        let pct_text = format!("{:.1}", delay_percentage);

        alerts.push(RawAlert {
            id: format!("delayed_wo_{}", wo.id),
            category: AlertCategory::DelayedOrders,
            severity,
            title: t_with_args("alerts.delayed_orders.title", &[("wo_number", &wo_number)]),
            message: t_with_args(
                "alerts.delayed_orders.message",
                &[
                    ("wo_number", &wo_number),
                    ("delay_hours", &hours_text),
                    ("delay_percentage", &pct_text),
                ],
            ),
            timestamp: now,
            priority: (delay_hours * 10.0) as i64,
            action_url: format!("/workorders/{}/", wo.id),
            details: json!({
                "wo_id": wo.id,
                "wo_number": wo_number,
                "delay_hours": round1(delay_hours),
                "delay_percentage": round1(delay_percentage),
                "estimated_completion": eta.to_rfc3339(),
                "technician_id": wo.primary_technician_id,
            }),
            reference: AlertReference::work_order(wo.id, wo_number.clone()),
        });
    }
    Ok(alerts)
}

// ==========================================
// 2. 库存不足
// ==========================================
// 售罄 → 一条 critical 聚合告警；低于 low_stock_percentage → 一条 medium 聚合告警
fn detect_low_stock(
    operations: &dyn OperationsRepository,
    thresholds: &ThresholdConfig,
    now: DateTime<Utc>,
) -> RepositoryResult<Vec<RawAlert>> {
    let stock = operations.list_stock(true)?;

    let mut depleted: Vec<(String, Value)> = Vec::new();
    let mut low: Vec<(String, Value)> = Vec::new();

    for record in &stock {
        let current_qty = record.quantity.unwrap_or(0.0);
        let min_qty = record.min_quantity.unwrap_or(0.0);
        if min_qty <= 0.0 {
            continue;
        }
        let stock_percentage = current_qty / min_qty * 100.0;

        if current_qty <= 0.0 {
            depleted.push((
                format!("{} ({})", record.code(), record.name()),
                json!({
                    "product_code": record.code(),
                    "product_name": record.name(),
                    "current_qty": current_qty,
                    "min_qty": min_qty,
                    "warehouse": record.warehouse(),
                }),
            ));
        } else if stock_percentage < thresholds.low_stock_percentage {
            low.push((
                record.code(),
                json!({
                    "product_code": record.code(),
                    "product_name": record.name(),
                    "current_qty": current_qty,
                    "min_qty": min_qty,
                    "stock_percentage": stock_percentage,
                    "warehouse": record.warehouse(),
                }),
            ));
        }
    }

    let mut alerts = Vec::new();
    if !depleted.is_empty() {
        alerts.push(stock_alert("low_stock_critical", Severity::Critical, 90, "critical", depleted, now));
    }
    if !low.is_empty() {
        alerts.push(stock_alert("low_stock_warning", Severity::Medium, 50, "warning", low, now));
    }
    Ok(alerts)
}

fn stock_alert(
    id: &str,
    severity: Severity,
    priority: i64,
    variant: &str,
    entries: Vec<(String, Value)>,
    now: DateTime<Utc>,
) -> RawAlert {
    let count = entries.len().to_string();
    let (labels, items): (Vec<String>, Vec<Value>) = entries.into_iter().unzip();
    let listing = listing(&labels, STOCK_LISTING_LIMIT);

    RawAlert {
        id: id.to_string(),
        category: AlertCategory::LowStock,
        severity,
        title: t_with_args(&format!("alerts.low_stock.{}_title", variant), &[("count", &count)]),
        message: t_with_args(&format!("alerts.low_stock.{}_message", variant), &[("items", &listing)]),
        timestamp: now,
        priority,
        action_url: "/inventory/?filter=low_stock".to_string(),
        details: json!({
            "count": items.len(),
            "items": items,
        }),
        reference: AlertReference::aggregate(id),
    }
}

// ==========================================
// 3. 技术员超负荷
// ==========================================
fn detect_overloaded_technicians(
    operations: &dyn OperationsRepository,
    thresholds: &ThresholdConfig,
    now: DateTime<Utc>,
) -> RepositoryResult<Vec<RawAlert>> {
    let technicians = operations.list_technicians(true)?;
    let work_orders = operations.list_work_orders(&WorkOrderFilter::with_statuses(&WorkOrderStatus::ACTIVE))?;

    let max_orders = thresholds.max_orders_per_technician;
    let max_text = format_number(max_orders);

    let alerts = count_by_technician(&work_orders)
        .into_iter()
        .filter(|(_, count)| *count as f64 > max_orders)
        .map(|(tech_id, count)| {
            let name = technician_name(&technicians, tech_id);
            let count_text = count.to_string();
            RawAlert {
                id: format!("overloaded_tech_{}", tech_id),
                category: AlertCategory::OverloadedTechnicians,
                severity: Severity::Medium,
                title: t_with_args("alerts.overloaded_technicians.title", &[("name", &name)]),
                message: t_with_args(
                    "alerts.overloaded_technicians.message",
                    &[("name", &name), ("count", &count_text), ("max", &max_text)],
                ),
                timestamp: now,
                priority: count as i64 * 10,
                action_url: format!("/technicians/{}/", tech_id),
                details: json!({
                    "technician_id": tech_id,
                    "technician_name": name,
                    "order_count": count,
                    "max_recommended": max_orders,
                }),
                reference: AlertReference::technician(tech_id),
            }
        })
        .collect();
    Ok(alerts)
}

// ==========================================
// 4. 异常工时
// ==========================================
// 近 7 天完工且 actual_hours > estimated_hours × time_overrun_multiplier
fn detect_anomalous_services(
    operations: &dyn OperationsRepository,
    thresholds: &ThresholdConfig,
    now: DateTime<Utc>,
) -> RepositoryResult<Vec<RawAlert>> {
    let since = now.date_naive() - Duration::days(ANOMALOUS_LOOKBACK_DAYS);
    let work_orders = operations.list_work_orders(
        &WorkOrderFilter::with_statuses(&[WorkOrderStatus::Completed]).completed_since(since),
    )?;

    let multiplier = thresholds.time_overrun_multiplier;
    let mut numbers = Vec::new();
    let mut orders = Vec::new();

    for wo in &work_orders {
        let estimated = wo.estimated_hours.unwrap_or(0.0);
        let actual = wo.actual_hours.unwrap_or(0.0);
        if estimated <= 0.0 || actual <= estimated * multiplier {
            continue;
        }
        let wo_number = wo.display_number();
        orders.push(json!({
            "wo_id": wo.id,
            "wo_number": wo_number,
            "estimated_hours": estimated,
            "actual_hours": actual,
            "overrun_percentage": (actual - estimated) / estimated * 100.0,
        }));
        numbers.push(wo_number);
    }

    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let count = orders.len();
    let count_text = count.to_string();
    let overrun_text = (((multiplier - 1.0) * 100.0) as i64).to_string();
    let listing = listing(&numbers, ANOMALOUS_LISTING_LIMIT);
    let id = "anomalous_services";

    Ok(vec![RawAlert {
        id: id.to_string(),
        category: AlertCategory::AnomalousServices,
        severity: Severity::Low,
        title: t_with_args("alerts.anomalous_services.title", &[("count", &count_text)]),
        message: t_with_args(
            "alerts.anomalous_services.message",
            &[("count", &count_text), ("overrun", &overrun_text), ("orders", &listing)],
        ),
        timestamp: now,
        priority: count as i64 * 5,
        action_url: "/workorders/?filter=anomalous".to_string(),
        details: json!({
            "orders": orders,
            "count": count,
            "multiplier": multiplier,
        }),
        reference: AlertReference::aggregate(id),
    }])
}

// ==========================================
// 5. 高产出（正向告警）
// ==========================================
// 当日完工数 >= high_productivity_orders
fn detect_high_productivity(
    operations: &dyn OperationsRepository,
    thresholds: &ThresholdConfig,
    now: DateTime<Utc>,
) -> RepositoryResult<Vec<RawAlert>> {
    let today = now.date_naive();
    let work_orders = operations.list_work_orders(
        &WorkOrderFilter::with_statuses(&[WorkOrderStatus::Completed]).completed_since(today),
    )?;
    let completed_today: Vec<WorkOrder> = work_orders
        .into_iter()
        .filter(|wo| wo.completed_date == Some(today))
        .collect();

    let counts = count_by_technician(&completed_today);
    if counts.is_empty() {
        return Ok(Vec::new());
    }
    let technicians = operations.list_technicians(false)?;
    let day = today.format("%Y-%m-%d").to_string();

    let alerts = counts
        .into_iter()
        .filter(|(_, count)| *count as f64 >= thresholds.high_productivity_orders)
        .map(|(tech_id, count)| {
            let name = technician_name(&technicians, tech_id);
            let count_text = count.to_string();
            RawAlert {
                id: format!("high_productivity_{}_{}", tech_id, day),
                category: AlertCategory::HighProductivity,
                severity: Severity::Low,
                title: t_with_args("alerts.high_productivity.title", &[("name", &name)]),
                message: t_with_args(
                    "alerts.high_productivity.message",
                    &[("name", &name), ("count", &count_text)],
                ),
                timestamp: now,
                priority: count as i64 * 5,
                action_url: format!("/technicians/{}/", tech_id),
                details: json!({
                    "technician_id": tech_id,
                    "technician_name": name,
                    "orders_completed_today": count,
                    "date": day,
                }),
                reference: AlertReference::technician_on(tech_id, day.clone()),
            }
        })
        .collect();
    Ok(alerts)
}

// ==========================================
// 6. 未分派工单
// ==========================================
fn detect_unassigned_orders(
    operations: &dyn OperationsRepository,
    now: DateTime<Utc>,
) -> RepositoryResult<Vec<RawAlert>> {
    let work_orders = operations.list_work_orders(&WorkOrderFilter::with_statuses(&WorkOrderStatus::ACTIVE))?;
    let unassigned: Vec<&WorkOrder> = work_orders
        .iter()
        .filter(|wo| wo.primary_technician_id.is_none())
        .collect();

    if unassigned.is_empty() {
        return Ok(Vec::new());
    }

    let count = unassigned.len();
    let count_text = count.to_string();
    let numbers: Vec<String> = unassigned.iter().map(|wo| wo.display_number()).collect();
    let listing = listing(&numbers, UNASSIGNED_LISTING_LIMIT);
    let id = "unassigned_orders";

    Ok(vec![RawAlert {
        id: id.to_string(),
        category: AlertCategory::UnassignedOrders,
        severity: Severity::Medium,
        title: t_with_args("alerts.unassigned_orders.title", &[("count", &count_text)]),
        message: t_with_args(
            "alerts.unassigned_orders.message",
            &[("count", &count_text), ("orders", &listing)],
        ),
        timestamp: now,
        priority: count as i64 * 10,
        action_url: "/workorders/?filter=unassigned".to_string(),
        details: json!({
            "orders": unassigned
                .iter()
                .map(|wo| json!({"wo_id": wo.id, "wo_number": wo.wo_number}))
                .collect::<Vec<_>>(),
            "count": count,
        }),
        reference: AlertReference::aggregate(id),
    }])
}

// ==========================================
// 辅助函数
// ==========================================

/// 按技术员计数（技术员 ID 升序）
fn count_by_technician(work_orders: &[WorkOrder]) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for tech_id in work_orders.iter().filter_map(|wo| wo.primary_technician_id) {
        *counts.entry(tech_id).or_insert(0) += 1;
    }
    counts
}

fn technician_name(technicians: &[Technician], tech_id: i64) -> String {
    technicians
        .iter()
        .find(|t| t.id == tech_id)
        .and_then(|t| t.name.clone())
        .unwrap_or_else(|| t_with_args("alerts.technician_fallback", &[("id", &tech_id.to_string())]))
}

/// 列出前 limit 项，其余以 "y N más" 结尾
fn listing(labels: &[String], limit: usize) -> String {
    let mut text = labels.iter().take(limit).cloned().collect::<Vec<_>>().join(", ");
    if labels.len() > limit {
        let rest = (labels.len() - limit).to_string();
        text.push_str(&t_with_args("alerts.more_suffix", &[("count", &rest)]));
    }
    text
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}
