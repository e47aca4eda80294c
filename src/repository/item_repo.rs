// ==========================================
// 商品批量导入系统 - 商品 Repository Trait
// ==========================================
// 职责: 定义商品数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::item::{ItemSnapshot, NewItem, StoredItem};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::collections::HashMap;

// ==========================================
// ItemRepository Trait
// ==========================================
// 实现者: ItemRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait ItemRepository: Send + Sync {
    // ===== 查询 =====

    /// 一次查询取回全部已存在 SKU 的快照
    ///
    /// # 参数
    /// - skus: 待检查的 SKU 列表
    ///
    /// # 返回
    /// - Ok(HashMap<sku, ItemSnapshot>): 已存在的 SKU 及其快照（属性为规范化名称）
    async fn find_snapshots_by_skus(
        &self,
        skus: &[String],
    ) -> RepositoryResult<HashMap<String, ItemSnapshot>>;

    /// 按 SKU 查询单个商品
    async fn find_by_sku(&self, sku: &str) -> RepositoryResult<Option<StoredItem>>;

    /// 统计商品数
    async fn count_items(&self) -> RepositoryResult<usize>;

    // ===== 写入 =====

    /// 批量插入商品（单事务）
    ///
    /// # 返回
    /// - Ok(usize): 插入条数
    /// - Err: 数据库错误（整个事务回滚）
    async fn batch_insert_items(&self, items: Vec<NewItem>) -> RepositoryResult<usize>;

    /// 覆盖单个 SKU 的库存数量（非累加）
    ///
    /// # 返回
    /// - Err(NotFound): SKU 不存在
    async fn update_quantity(&self, sku: &str, quantity: i64) -> RepositoryResult<()>;

    /// 单事务批量覆盖库存数量
    ///
    /// 任意一行失败则整体回滚
    async fn batch_update_quantities(&self, updates: Vec<(String, i64)>)
        -> RepositoryResult<usize>;
}
