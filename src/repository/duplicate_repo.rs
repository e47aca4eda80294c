// ==========================================
// 商品批量导入系统 - 重复队列 Repository Trait
// ==========================================
// 职责: duplicate_entries 表的写入 / 查询 / 状态流转
// 红线: resolution 只允许从 NULL 单向写入终态
// ==========================================

use crate::domain::import::DuplicateEntry;
use crate::domain::item::NewItem;
use crate::domain::types::DuplicateResolution;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

// ==========================================
// DuplicateRepository Trait
// ==========================================
// 实现者: DuplicateRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait DuplicateRepository: Send + Sync {
    // ===== 写入 =====

    /// 批量写入重复条目（单事务）
    async fn batch_insert_entries(&self, entries: Vec<DuplicateEntry>) -> RepositoryResult<usize>;

    /// 将条目标记为已处理
    ///
    /// # 返回
    /// - Err(NotFound): 条目不存在
    /// - Err(AlreadyResolved): 条目已处理（不可重新打开）
    async fn mark_resolved(
        &self,
        entry_id: &str,
        resolution: DuplicateResolution,
        resolved_at: DateTime<Utc>,
    ) -> RepositoryResult<()>;

    /// 以 update_with_new 处理条目并覆盖商品（单事务）
    ///
    /// 先条件更新认领条目，认领成功后在同一事务内覆盖商品；
    /// 任一步失败则整体回滚，条目保持待处理。
    ///
    /// # 返回
    /// - Err(NotFound): 条目或商品不存在
    /// - Err(AlreadyResolved): 条目已处理（商品不被修改）
    async fn resolve_with_overwrite(
        &self,
        entry_id: &str,
        item: &NewItem,
        resolved_at: DateTime<Utc>,
    ) -> RepositoryResult<()>;

    // ===== 查询 =====

    /// 待处理条目（resolution IS NULL），按创建时间升序分页
    async fn list_pending(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<DuplicateEntry>>;

    /// 待处理条目总数
    async fn count_pending(&self) -> RepositoryResult<i64>;

    /// 某次导入运行产生的全部条目
    async fn list_by_run(&self, run_id: &str) -> RepositoryResult<Vec<DuplicateEntry>>;

    /// 根据 ID 获取单个条目
    async fn get_by_id(&self, entry_id: &str) -> RepositoryResult<Option<DuplicateEntry>>;
}
