// ==========================================
// 商品批量导入系统 - 属性物化
// ==========================================
// 职责: 操作员确认后创建新属性值，并把 ID 写入运行级缓存
// 红线: 全部新值在同一事务内创建，任一失败则整个运行终止
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::run_context::ImportRunContext;
use crate::repository::attribute_repo::AttributeRepository;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// 物化阶段结束时的进度
pub const MATERIALIZE_PROGRESS: u8 = 55;

pub struct AttributeMaterializer {
    attribute_repo: Arc<dyn AttributeRepository>,
}

impl AttributeMaterializer {
    pub fn new(attribute_repo: Arc<dyn AttributeRepository>) -> Self {
        Self { attribute_repo }
    }

    /// 创建待确认集合中的全部值
    ///
    /// # 返回
    /// - Ok(usize): 本次处理的值数量（含确认期间已被他人创建而复用的值）
    /// - Err(ImportError::AttributeCreation): 事务回滚，未留下部分属性
    #[instrument(skip(self, context), fields(run_id = %context.run_id))]
    pub async fn materialize(&self, context: &mut ImportRunContext) -> ImportResult<usize> {
        if context.pending.is_empty() {
            context.progress.advance_to(MATERIALIZE_PROGRESS);
            return Ok(0);
        }

        let values: Vec<_> = context.pending.iter().cloned().collect();

        let created = self
            .attribute_repo
            .create_confirmed(&values)
            .await
            .map_err(|e| {
                error!(error = %e, count = values.len(), "属性物化失败，运行终止");
                ImportError::AttributeCreation {
                    values: values
                        .iter()
                        .map(|v| format!("{}: {}", v.kind.file_header(), v.normalized_value))
                        .collect(),
                    message: e.to_string(),
                }
            })?;

        let count = created.len();
        for (value, id) in created {
            context.cache.insert(value.kind, value.normalized_value, id);
        }
        context.pending.clear();
        context.progress.advance_to(MATERIALIZE_PROGRESS);

        info!(count = count, "新属性值已物化");
        Ok(count)
    }
}
