// ==========================================
// ForgeDB 核心 - 告警 Repository Trait
// ==========================================
// 职责: 定义告警/升级记录的数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 并发: upsert / 升级 均为原子操作，调用方不得自行拼装“先查后写”
// ==========================================

use crate::domain::alert::{AlertRecord, AlertReference, EscalationRecord, NewAlert, UpsertOutcome};
use crate::domain::types::AlertCategory;
use crate::repository::error::RepositoryResult;
use chrono::{DateTime, Utc};

// ==========================================
// AlertRepository Trait
// ==========================================
// 实现者: AlertRepositoryImpl（使用 rusqlite）
pub trait AlertRepository: Send + Sync {
    // ===== 查询 =====

    /// 查询 (类别, 引用) 下最新的开放告警
    ///
    /// 开放状态: new / read / acknowledged
    fn find_open_alert(
        &self,
        category: AlertCategory,
        reference: &AlertReference,
    ) -> RepositoryResult<Option<AlertRecord>>;

    /// 按 ID 查询
    fn find_by_id(&self, alert_id: i64) -> RepositoryResult<Option<AlertRecord>>;

    /// 查询所有开放告警（最新在前）
    fn list_open_alerts(&self) -> RepositoryResult<Vec<AlertRecord>>;

    // ===== 写入 =====

    /// 插入新告警（status = new）
    fn insert_alert(&self, alert: &NewAlert) -> RepositoryResult<i64>;

    /// 原地更新告警内容（title / message / details / severity）
    fn update_alert(&self, alert_id: i64, alert: &NewAlert) -> RepositoryResult<()>;

    /// 按自然键原子 upsert 开放告警
    ///
    /// # 返回
    /// - created = true: 新插入
    /// - created = false: 更新了已存在的开放告警
    fn upsert_open_alert(&self, alert: &NewAlert) -> RepositoryResult<UpsertOutcome>;

    // ===== 升级记录 =====

    /// 当前升级级别（无升级记录时为 0）
    fn escalation_level(&self, alert_id: i64) -> RepositoryResult<i32>;

    /// 最近一次升级记录
    fn latest_escalation(&self, alert_id: i64) -> RepositoryResult<Option<EscalationRecord>>;

    /// 查询告警的全部升级记录（级别升序）
    fn list_escalations(&self, alert_id: i64) -> RepositoryResult<Vec<EscalationRecord>>;

    /// 直接插入升级记录
    fn insert_escalation_record(&self, record: &EscalationRecord) -> RepositoryResult<i64>;

    /// 原子升级（比较并交换）
    ///
    /// 仅当告警当前级别 == record.escalation_level - 1 时写入升级记录
    /// 并把告警严重度改为 record.escalated_severity。
    ///
    /// # 返回
    /// - Ok(true): 已升级
    /// - Ok(false): 级别已被其他检测轮次推进，未写入
    fn record_escalation(&self, record: &EscalationRecord) -> RepositoryResult<bool>;

    // ===== 生命周期 =====

    /// 标记已读（new → read）
    fn mark_read(&self, alert_id: i64, at: DateTime<Utc>) -> RepositoryResult<AlertRecord>;

    /// 确认（new/read → acknowledged）
    fn acknowledge(&self, alert_id: i64, at: DateTime<Utc>) -> RepositoryResult<AlertRecord>;

    /// 解决（开放 → resolved，终态）
    fn resolve(&self, alert_id: i64, at: DateTime<Utc>) -> RepositoryResult<AlertRecord>;
}
