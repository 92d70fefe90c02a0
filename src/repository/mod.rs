// ==========================================
// ForgeDB 核心 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化
// ==========================================

pub mod alert_repo;
pub mod alert_repo_impl;
pub mod error;
pub mod operations_repo;
pub mod operations_repo_impl;

// 重导出核心仓储
pub use alert_repo::AlertRepository;
pub use alert_repo_impl::AlertRepositoryImpl;
pub use error::{RepositoryError, RepositoryResult};
pub use operations_repo::{OperationsRepository, WorkOrderFilter, DEFAULT_PAGE_SIZE};
pub use operations_repo_impl::OperationsRepositoryImpl;
