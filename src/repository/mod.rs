// ==========================================
// 商品批量导入系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有值使用参数化,防止 SQL 注入
// ==========================================

pub mod attribute_repo;
pub mod attribute_repo_impl;
pub mod duplicate_repo;
pub mod duplicate_repo_impl;
pub mod error;
pub mod item_repo;
pub mod item_repo_impl;

// 重导出核心仓储
pub use attribute_repo::AttributeRepository;
pub use attribute_repo_impl::AttributeRepositoryImpl;
pub use duplicate_repo::DuplicateRepository;
pub use duplicate_repo_impl::DuplicateRepositoryImpl;
pub use error::{RepositoryError, RepositoryResult};
pub use item_repo::ItemRepository;
pub use item_repo_impl::ItemRepositoryImpl;

use chrono::{DateTime, Utc};

/// 解析 RFC3339 时间戳（历史数据格式异常时回退为 UNIX 纪元）
pub(crate) fn parse_rfc3339(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}
