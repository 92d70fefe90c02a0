// ==========================================
// ForgeDB 核心 - 运营数据 Repository Trait
// ==========================================
// 职责: 告警检测所需的只读数据访问（工单 / 库存 / 技术员）
// 红线: 只读；不含阈值判定
// ==========================================

use crate::domain::operations::{StockRecord, Technician, WorkOrder};
use crate::domain::types::WorkOrderStatus;
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;

/// 默认分页大小
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// 工单查询条件
#[derive(Debug, Clone, PartialEq)]
pub struct WorkOrderFilter {
    /// 为空表示不过滤状态
    pub statuses: Vec<WorkOrderStatus>,
    /// completed_date >= 该日期
    pub completed_since: Option<NaiveDate>,
    pub technician_id: Option<i64>,
    pub page_size: usize,
}

impl Default for WorkOrderFilter {
    fn default() -> Self {
        Self {
            statuses: Vec::new(),
            completed_since: None,
            technician_id: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl WorkOrderFilter {
    pub fn with_statuses(statuses: &[WorkOrderStatus]) -> Self {
        Self {
            statuses: statuses.to_vec(),
            ..Self::default()
        }
    }

    pub fn completed_since(mut self, date: NaiveDate) -> Self {
        self.completed_since = Some(date);
        self
    }

    pub fn for_technician(mut self, technician_id: i64) -> Self {
        self.technician_id = Some(technician_id);
        self
    }
}

// ==========================================
// OperationsRepository Trait
// ==========================================
// 实现者: OperationsRepositoryImpl（rusqlite）；测试中可替换为内存实现
pub trait OperationsRepository: Send + Sync {
    /// 查询工单
    fn list_work_orders(&self, filter: &WorkOrderFilter) -> RepositoryResult<Vec<WorkOrder>>;

    /// 查询库存
    ///
    /// # 参数
    /// - low_stock_only: 仅返回 quantity <= min_quantity 的记录
    fn list_stock(&self, low_stock_only: bool) -> RepositoryResult<Vec<StockRecord>>;

    /// 查询技术员
    fn list_technicians(&self, active_only: bool) -> RepositoryResult<Vec<Technician>>;
}
