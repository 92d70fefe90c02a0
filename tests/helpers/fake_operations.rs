// ==========================================
// 内存运营数据源 - 用于集成测试
// ==========================================
// InMemoryOperations: 按 WorkOrderFilter 语义过滤的内存实现
// 可按数据集注入故障，验证类别隔离
// ==========================================

#![allow(dead_code)]

use std::sync::Mutex;

use forge_core::domain::operations::{StockRecord, Technician, WorkOrder};
use forge_core::repository::error::{RepositoryError, RepositoryResult};
use forge_core::repository::operations_repo::{OperationsRepository, WorkOrderFilter};

/// 可注入故障的数据集
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    WorkOrders,
    Stock,
    Technicians,
}

#[derive(Default)]
pub struct InMemoryOperations {
    work_orders: Mutex<Vec<WorkOrder>>,
    stock: Mutex<Vec<StockRecord>>,
    technicians: Mutex<Vec<Technician>>,
    failing: Mutex<Vec<Dataset>>,
}

impl InMemoryOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_work_orders(self, work_orders: Vec<WorkOrder>) -> Self {
        *self.work_orders.lock().unwrap() = work_orders;
        self
    }

    pub fn with_stock(self, stock: Vec<StockRecord>) -> Self {
        *self.stock.lock().unwrap() = stock;
        self
    }

    pub fn with_technicians(self, technicians: Vec<Technician>) -> Self {
        *self.technicians.lock().unwrap() = technicians;
        self
    }

    pub fn failing(self, dataset: Dataset) -> Self {
        self.failing.lock().unwrap().push(dataset);
        self
    }

    /// 运行中替换工单（模拟数据变化）
    pub fn replace_work_orders(&self, work_orders: Vec<WorkOrder>) {
        *self.work_orders.lock().unwrap() = work_orders;
    }

    fn check(&self, dataset: Dataset) -> RepositoryResult<()> {
        if self.failing.lock().unwrap().contains(&dataset) {
            return Err(RepositoryError::DatabaseConnectionError(format!(
                "{:?} offline",
                dataset
            )));
        }
        Ok(())
    }
}

impl OperationsRepository for InMemoryOperations {
    fn list_work_orders(&self, filter: &WorkOrderFilter) -> RepositoryResult<Vec<WorkOrder>> {
        self.check(Dataset::WorkOrders)?;
        Ok(self
            .work_orders
            .lock()
            .unwrap()
            .iter()
            .filter(|wo| filter.statuses.is_empty() || filter.statuses.contains(&wo.status))
            .filter(|wo| match filter.completed_since {
                None => true,
                Some(since) => wo.completed_date.map(|d| d >= since).unwrap_or(false),
            })
            .filter(|wo| match filter.technician_id {
                None => true,
                Some(id) => wo.primary_technician_id == Some(id),
            })
            .take(filter.page_size)
            .cloned()
            .collect())
    }

    fn list_stock(&self, low_stock_only: bool) -> RepositoryResult<Vec<StockRecord>> {
        self.check(Dataset::Stock)?;
        Ok(self
            .stock
            .lock()
            .unwrap()
            .iter()
            .filter(|s| !low_stock_only || s.quantity.unwrap_or(0.0) <= s.min_quantity.unwrap_or(0.0))
            .cloned()
            .collect())
    }

    fn list_technicians(&self, active_only: bool) -> RepositoryResult<Vec<Technician>> {
        self.check(Dataset::Technicians)?;
        Ok(self
            .technicians
            .lock()
            .unwrap()
            .iter()
            .filter(|t| !active_only || t.is_active)
            .cloned()
            .collect())
    }
}
