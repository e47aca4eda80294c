// ==========================================
// 商品批量导入系统 - 导入层
// ==========================================
// 职责: 外部数据导入（文件 / 行数组）→ 商品与重复队列
// 流程: 解析 → 行校验 → 属性预检 → 确认闸门 → 属性物化 → 重复分类 → 落库
// ==========================================

// 模块声明
pub mod attribute_materializer;
pub mod attribute_resolver;
pub mod duplicate_classifier;
pub mod error;
pub mod file_parser;
pub mod item_importer_impl;
pub mod item_importer_trait;
pub mod row_validator;
pub mod run_context;

// 重导出核心类型
pub use attribute_materializer::AttributeMaterializer;
pub use attribute_resolver::AttributeResolver;
pub use duplicate_classifier::{ClassificationPlan, DuplicateClassifier, RowDecision};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use item_importer_impl::ItemImporterImpl;
pub use row_validator::ItemRowValidator;
pub use run_context::{AttributeCache, ImportProgress, ImportRunContext, PendingImport};

// 重导出 Trait 接口
pub use item_importer_trait::{
    FileParser, ImportOptions, ImportStep, ItemImporter, RowValidator,
};
