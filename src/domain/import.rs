// ==========================================
// 商品批量导入系统 - 导入领域模型
// ==========================================
// 职责: 待确认属性 / 导入结果 / 重复队列条目
// ==========================================

use crate::domain::item::ItemSnapshot;
use crate::domain::types::{AttributeKind, DuplicateResolution, ImportMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// PendingAttributeValue - 待确认的新属性值
// ==========================================
// 预检阶段生成；物化或取消后销毁
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PendingAttributeValue {
    pub kind: AttributeKind,
    pub normalized_value: String,
}

impl PendingAttributeValue {
    /// 确认弹窗展示用的 {表头, 值}
    pub fn prompt(&self) -> PendingAttributePrompt {
        PendingAttributePrompt {
            header: self.kind.file_header().to_string(),
            value: self.normalized_value.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAttributePrompt {
    pub header: String,
    pub value: String,
}

// ==========================================
// ImportOutcome - 导入结果（每次运行只返回一次）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub run_id: String,
    pub mode: ImportMode,
    pub total: usize,      // 校验通过的行数
    pub success: usize,    // 插入/更新成功
    pub failed: usize,     // 失败（含 FULL/NEW_ONLY 下的重复行）
    pub duplicates: usize, // SKU 已存在
    pub queued: usize,     // 实际写入重复队列的条目
    pub skipped: usize,    // QUANTITY_ONLY 下不存在的 SKU
    pub errors: Vec<String>,
    pub elapsed_ms: u64,
}

impl ImportOutcome {
    pub fn new(run_id: String, mode: ImportMode, total: usize) -> Self {
        Self {
            run_id,
            mode,
            total,
            success: 0,
            failed: 0,
            duplicates: 0,
            queued: 0,
            skipped: 0,
            errors: Vec::new(),
            elapsed_ms: 0,
        }
    }

    /// 前 N 条错误 + 截断提示
    pub fn error_summary(&self, limit: usize) -> Vec<String> {
        let mut summary: Vec<String> = self.errors.iter().take(limit).cloned().collect();
        if self.errors.len() > limit {
            summary.push(format!("……另有 {} 条错误未显示", self.errors.len() - limit));
        }
        summary
    }

    /// 是否对存储产生了写入
    pub fn has_mutations(&self) -> bool {
        self.success > 0 || self.queued > 0
    }
}

// ==========================================
// DuplicateEntry - 重复队列条目
// ==========================================
// FULL 模式下 SKU 冲突时生成；resolution 从 None 单向流转为终态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateEntry {
    pub entry_id: String,
    pub run_id: String,
    pub sku: String,
    pub existing_snapshot: ItemSnapshot,
    pub incoming_snapshot: ItemSnapshot,
    pub difference_note: String,
    pub resolution: Option<DuplicateResolution>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DuplicateEntry {
    pub fn new(run_id: &str, existing: ItemSnapshot, incoming: ItemSnapshot) -> Self {
        let changes = existing.diff(&incoming);
        let difference_note = if changes.is_empty() {
            "无字段差异".to_string()
        } else {
            changes.join("; ")
        };

        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            run_id: run_id.to_string(),
            sku: incoming.sku.clone(),
            existing_snapshot: existing,
            incoming_snapshot: incoming,
            difference_note,
            resolution: None,
            resolved_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}
