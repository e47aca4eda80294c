// ==========================================
// 商品批量导入系统 - 属性预检与按需解析
// ==========================================
// 职责: 收集校验后各行的 9 维属性值 → 规范化 → 找出需确认的新值
// 约束: 每个 (种类, 规范化值) 只探测一次，命中结果写入运行级缓存
// ==========================================

use crate::domain::import::PendingAttributeValue;
use crate::domain::item::normalize_attribute_value;
use crate::domain::types::AttributeKind;
use crate::importer::error::ImportResult;
use crate::importer::run_context::{AttributeCache, ImportRunContext};
use crate::repository::attribute_repo::AttributeRepository;
use crate::repository::error::RepositoryResult;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// 预检阶段进度区间
pub const PRECHECK_PROGRESS: (u8, u8) = (10, 40);

pub struct AttributeResolver {
    attribute_repo: Arc<dyn AttributeRepository>,
}

impl AttributeResolver {
    pub fn new(attribute_repo: Arc<dyn AttributeRepository>) -> Self {
        Self { attribute_repo }
    }

    /// 收集整批记录中出现的全部 (种类, 规范化值)
    pub fn distinct_values(context: &ImportRunContext) -> BTreeSet<(AttributeKind, String)> {
        context
            .records
            .iter()
            .flat_map(|record| record.attributes.iter())
            .filter_map(|(kind, raw)| normalize_attribute_value(raw).map(|value| (kind, value)))
            .collect()
    }

    /// 预检: 已存在的值写入缓存，不存在的值放入待确认集合
    #[instrument(skip(self, context), fields(run_id = %context.run_id))]
    pub async fn precheck(&self, context: &mut ImportRunContext) -> ImportResult<()> {
        let distinct = Self::distinct_values(context);
        let total = distinct.len();
        let (start, end) = PRECHECK_PROGRESS;

        for (done, (kind, value)) in distinct.into_iter().enumerate() {
            match self.attribute_repo.find_id(kind, &value).await? {
                Some(id) => context.cache.insert(kind, value, id),
                None => {
                    debug!(kind = kind.as_str(), value = %value, "发现新属性值");
                    context.pending.insert(PendingAttributeValue {
                        kind,
                        normalized_value: value,
                    });
                }
            }
            context.progress.advance_within(start, end, done + 1, total);
        }
        context.progress.advance_to(end);

        info!(
            distinct = total,
            cached = context.cache.len(),
            pending = context.pending.len(),
            "属性预检完成"
        );
        Ok(())
    }

    /// 按需解析单个属性值（缓存优先，未命中则 upsert）
    ///
    /// # 返回
    /// - Ok(None): 值为空白
    /// - Ok(Some(id)): 参考表 ID
    pub async fn resolve(
        &self,
        cache: &mut AttributeCache,
        kind: AttributeKind,
        raw_value: &str,
    ) -> RepositoryResult<Option<i64>> {
        let Some(value) = normalize_attribute_value(raw_value) else {
            return Ok(None);
        };

        if let Some(id) = cache.get(kind, &value) {
            return Ok(Some(id));
        }

        let id = self.attribute_repo.ensure(kind, &value).await?;
        cache.insert(kind, value, id);
        Ok(Some(id))
    }
}
