// ==========================================
// 商品批量导入系统 - 重复分类器
// ==========================================
// 职责: 按 SKU 是否已存在 × 导入模式，决定每一行的处理动作
// 说明: 纯函数，不访问存储；落库由 ItemImporterImpl 执行
// ==========================================

use crate::domain::item::{ItemSnapshot, ValidatedItemRecord};
use crate::domain::types::ImportMode;
use std::collections::HashMap;

/// 单行处理动作
#[derive(Debug, Clone, PartialEq)]
pub enum RowDecision {
    /// SKU 不存在（FULL / NEW_ONLY）: 解析属性并插入
    Insert,
    /// SKU 已存在（QUANTITY_ONLY）: 覆盖数量
    UpdateQuantity { quantity: i64 },
    /// SKU 已存在（FULL）: 不修改，进入重复队列
    Defer { existing: ItemSnapshot },
    /// SKU 已存在（NEW_ONLY）: 拒绝
    Reject,
    /// SKU 不存在（QUANTITY_ONLY）: 跳过
    Skip,
}

/// 整批分类结果（保持原始行顺序）
#[derive(Debug, Default)]
pub struct ClassificationPlan<'a> {
    pub inserts: Vec<&'a ValidatedItemRecord>,
    pub quantity_updates: Vec<(String, i64)>,
    pub deferred: Vec<(ItemSnapshot, &'a ValidatedItemRecord)>,
    pub rejected: Vec<&'a ValidatedItemRecord>,
    pub skipped: Vec<&'a ValidatedItemRecord>,
}

impl ClassificationPlan<'_> {
    pub fn len(&self) -> usize {
        self.inserts.len()
            + self.quantity_updates.len()
            + self.deferred.len()
            + self.rejected.len()
            + self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct DuplicateClassifier;

impl DuplicateClassifier {
    /// 单行分类
    ///
    /// # 参数
    /// - existing: 该 SKU 在库中的快照（None 表示不存在）
    pub fn classify(
        mode: ImportMode,
        record: &ValidatedItemRecord,
        existing: Option<&ItemSnapshot>,
    ) -> RowDecision {
        match (existing, mode) {
            (Some(snapshot), ImportMode::Full) => RowDecision::Defer {
                existing: snapshot.clone(),
            },
            (Some(_), ImportMode::QuantityOnly) => RowDecision::UpdateQuantity {
                quantity: record.quantity,
            },
            (Some(_), ImportMode::NewOnly) => RowDecision::Reject,
            (None, ImportMode::QuantityOnly) => RowDecision::Skip,
            (None, ImportMode::Full | ImportMode::NewOnly) => RowDecision::Insert,
        }
    }

    /// 整批分类
    ///
    /// # 参数
    /// - existing: 一次查询取回的已存在 SKU 快照
    pub fn plan<'a>(
        mode: ImportMode,
        records: &'a [ValidatedItemRecord],
        existing: &HashMap<String, ItemSnapshot>,
    ) -> ClassificationPlan<'a> {
        let mut plan = ClassificationPlan::default();

        for record in records {
            match Self::classify(mode, record, existing.get(&record.sku)) {
                RowDecision::Insert => plan.inserts.push(record),
                RowDecision::UpdateQuantity { quantity } => {
                    plan.quantity_updates.push((record.sku.clone(), quantity))
                }
                RowDecision::Defer { existing } => plan.deferred.push((existing, record)),
                RowDecision::Reject => plan.rejected.push(record),
                RowDecision::Skip => plan.skipped.push(record),
            }
        }

        plan
    }
}
