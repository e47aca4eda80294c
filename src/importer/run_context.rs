// ==========================================
// 商品批量导入系统 - 导入运行上下文
// ==========================================
// 职责: 单次导入运行的全部状态（显式传递，不使用全局变量）
// 生命周期: 校验通过时创建 → 确认/取消/完成时销毁
// ==========================================

use crate::domain::import::{PendingAttributePrompt, PendingAttributeValue};
use crate::domain::item::ValidatedItemRecord;
use crate::domain::types::{AttributeKind, ImportMode, QuantityUpdateStrategy};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// 运行结束前进度上限
pub const PROGRESS_CAP: u8 = 99;

// ==========================================
// ImportProgress - 进度句柄
// ==========================================

/// 导入进度（0-100）
///
/// 可克隆，多个克隆共享同一计数；只增不减，完成前封顶 99
#[derive(Debug, Clone, Default)]
pub struct ImportProgress {
    value: Arc<AtomicU8>,
}

impl ImportProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u8 {
        self.value.load(Ordering::Acquire)
    }

    /// 推进到指定百分比（低于当前值时忽略）
    pub fn advance_to(&self, percent: u8) {
        self.value
            .fetch_max(percent.min(PROGRESS_CAP), Ordering::AcqRel);
    }

    /// 在 [start, end] 区间内按 done/total 线性推进
    pub fn advance_within(&self, start: u8, end: u8, done: usize, total: usize) {
        if total == 0 {
            self.advance_to(end);
            return;
        }
        let span = end.saturating_sub(start) as usize;
        let offset = (span * done.min(total)) / total;
        self.advance_to(start.saturating_add(offset as u8));
    }

    pub fn finish(&self) {
        self.value.store(100, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.get() >= 100
    }
}

// ==========================================
// AttributeCache - 运行级属性 ID 缓存
// ==========================================

/// (属性种类, 规范化值) → 参考表 ID
#[derive(Debug, Clone, Default)]
pub struct AttributeCache {
    ids: HashMap<(AttributeKind, String), i64>,
}

impl AttributeCache {
    pub fn get(&self, kind: AttributeKind, normalized_value: &str) -> Option<i64> {
        self.ids.get(&(kind, normalized_value.to_string())).copied()
    }

    pub fn insert(&mut self, kind: AttributeKind, normalized_value: String, id: i64) {
        self.ids.insert((kind, normalized_value), id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// ==========================================
// ImportRunContext
// ==========================================
#[derive(Debug)]
pub struct ImportRunContext {
    pub run_id: String,
    pub mode: ImportMode,
    /// 运行开始时读取，落库阶段不再访问配置
    pub quantity_strategy: QuantityUpdateStrategy,
    pub records: Vec<ValidatedItemRecord>,
    pub pending: BTreeSet<PendingAttributeValue>,
    pub cache: AttributeCache,
    pub progress: ImportProgress,
    pub started_at: Instant,
}

impl ImportRunContext {
    pub fn new(
        mode: ImportMode,
        records: Vec<ValidatedItemRecord>,
        progress: ImportProgress,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            mode,
            quantity_strategy: QuantityUpdateStrategy::Batch,
            records,
            pending: BTreeSet::new(),
            cache: AttributeCache::default(),
            progress,
            started_at: Instant::now(),
        }
    }

    pub fn with_quantity_strategy(mut self, strategy: QuantityUpdateStrategy) -> Self {
        self.quantity_strategy = strategy;
        self
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}

// ==========================================
// PendingImport - 挂起在确认闸门的运行
// ==========================================

/// 等待操作员确认新属性值的运行
///
/// 由调用方持有；交给 `confirm` 继续，交给 `cancel` 或直接丢弃即放弃
#[derive(Debug)]
pub struct PendingImport {
    context: ImportRunContext,
}

impl PendingImport {
    pub(crate) fn new(context: ImportRunContext) -> Self {
        Self { context }
    }

    pub(crate) fn into_context(self) -> ImportRunContext {
        self.context
    }

    pub fn run_id(&self) -> &str {
        &self.context.run_id
    }

    pub fn mode(&self) -> ImportMode {
        self.context.mode
    }

    pub fn total(&self) -> usize {
        self.context.total()
    }

    pub fn progress(&self) -> &ImportProgress {
        &self.context.progress
    }

    pub fn pending_values(&self) -> impl Iterator<Item = &PendingAttributeValue> {
        self.context.pending.iter()
    }

    /// 展示给操作员的 {表头, 值} 列表（按属性种类、值排序）
    pub fn prompts(&self) -> Vec<PendingAttributePrompt> {
        self.context
            .pending
            .iter()
            .map(PendingAttributeValue::prompt)
            .collect()
    }
}
