// ==========================================
// 商品批量导入系统 - 参考属性 Repository Trait
// ==========================================
// 职责: 9 张参考表的查询 / 创建
// 红线: 传入的名称必须已规范化（TRIM + UPPER）
// ==========================================

use crate::domain::import::PendingAttributeValue;
use crate::domain::types::AttributeKind;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// AttributeRepository Trait
// ==========================================
// 实现者: AttributeRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait AttributeRepository: Send + Sync {
    /// 大小写不敏感的存在性探测
    ///
    /// # 返回
    /// - Ok(Some(id)): 已存在
    /// - Ok(None): 不存在
    async fn find_id(&self, kind: AttributeKind, name: &str) -> RepositoryResult<Option<i64>>;

    /// 在单个事务中创建已确认的属性值
    ///
    /// 每个值插入前会再查一次（防止预检与确认之间被并发写入）；
    /// 任何一个值失败则整个事务回滚。
    ///
    /// # 返回
    /// - Ok(Vec<(值, id)>): 与入参一一对应
    async fn create_confirmed(
        &self,
        values: &[PendingAttributeValue],
    ) -> RepositoryResult<Vec<(PendingAttributeValue, i64)>>;

    /// 按需解析：不存在则插入（ON CONFLICT DO NOTHING），返回 id
    async fn ensure(&self, kind: AttributeKind, name: &str) -> RepositoryResult<i64>;

    /// 统计某张参考表的行数
    async fn count(&self, kind: AttributeKind) -> RepositoryResult<usize>;
}
