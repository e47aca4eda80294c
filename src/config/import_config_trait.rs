// ==========================================
// 商品批量导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::{ImportMode, QuantityUpdateStrategy};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 导入结果中展示的错误条数上限（超出部分以截断提示代替）
    ///
    /// # 默认值
    /// - 10
    async fn get_max_reported_errors(&self) -> RepositoryResult<usize>;

    /// QUANTITY_ONLY 模式下数量更新的执行方式
    ///
    /// # 默认值
    /// - BATCH（单事务）
    async fn get_quantity_update_strategy(&self) -> RepositoryResult<QuantityUpdateStrategy>;

    /// 调用方未指定时使用的导入模式
    ///
    /// # 默认值
    /// - FULL
    async fn get_default_import_mode(&self) -> RepositoryResult<ImportMode>;
}
