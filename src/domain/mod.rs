// ==========================================
// 商品批量导入系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod import;
pub mod item;
pub mod types;

// 重导出核心类型
pub use import::{DuplicateEntry, ImportOutcome, PendingAttributePrompt, PendingAttributeValue};
pub use item::{
    normalize_attribute_value, AttributeValues, ItemSnapshot, NewItem, RawRow, SourceRow,
    StoredItem, ValidatedItemRecord, SKU_MAX_LEN,
};
pub use types::{AttributeKind, DuplicateResolution, ImportMode, QuantityUpdateStrategy};
