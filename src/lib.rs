// ==========================================
// 商品批量导入系统 - 核心库
// ==========================================
// 职责: 商品批量导入管道 + 重复对账队列
// 技术栈: Rust + SQLite
// 定位: 导入决策由操作员确认（新属性值 / 重复条目）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/表结构）
pub mod db;

// 刷新事件
pub mod events;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AttributeKind, DuplicateResolution, ImportMode, QuantityUpdateStrategy};

// 领域实体
pub use domain::{
    AttributeValues, DuplicateEntry, ImportOutcome, ItemSnapshot, PendingAttributePrompt,
    PendingAttributeValue, RawRow, ValidatedItemRecord,
};

// 导入管道
pub use importer::{
    ImportError, ImportOptions, ImportProgress, ImportStep, ItemImporter, ItemImporterImpl,
    PendingImport,
};

// API
pub use api::{ConfigApi, DuplicateApi, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "商品批量导入系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
