// ==========================================
// 商品批量导入系统 - 重复队列 API
// ==========================================
// 职责: 待处理重复条目的查询 / 处理 / 导出
// 红线: 处理结论单向写入，已处理条目不可重新打开
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::import::DuplicateEntry;
use crate::domain::item::NewItem;
use crate::domain::types::DuplicateResolution;
use crate::events::{ImportEvent, ImportEventKind, OptionalEventPublisher};
use crate::repository::{
    AttributeRepository, AttributeRepositoryImpl, DuplicateRepository, DuplicateRepositoryImpl,
};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// 分页上限
pub const MAX_PAGE_SIZE: i64 = 100;

/// 待处理条目列表响应（带分页信息）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateListResponse {
    pub entries: Vec<DuplicateEntry>,
    /// 待处理总数
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// 批量处理响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResolveResponse {
    pub success_count: usize,
    pub fail_count: usize,
    pub message: String,
    /// 失败的条目 ID 列表
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_ids: Vec<String>,
}

/// 重复队列 API
pub struct DuplicateApi {
    duplicate_repo: Arc<dyn DuplicateRepository>,
    attribute_repo: Arc<dyn AttributeRepository>,
    events: OptionalEventPublisher,
}

impl DuplicateApi {
    pub fn new(
        duplicate_repo: Arc<dyn DuplicateRepository>,
        attribute_repo: Arc<dyn AttributeRepository>,
        events: OptionalEventPublisher,
    ) -> Self {
        Self {
            duplicate_repo,
            attribute_repo,
            events,
        }
    }

    /// 基于共享连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>, events: OptionalEventPublisher) -> Self {
        Self::new(
            Arc::new(DuplicateRepositoryImpl::from_connection(conn.clone())),
            Arc::new(AttributeRepositoryImpl::from_connection(conn)),
            events,
        )
    }

    /// 待处理条目（分页）
    ///
    /// # 参数
    /// - limit: 每页数量（限制在 1-100 之间）
    /// - offset: 分页偏移（负数按 0 处理）
    pub async fn list_pending(&self, limit: i64, offset: i64) -> ApiResult<DuplicateListResponse> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = offset.max(0);

        let entries = self.duplicate_repo.list_pending(limit, offset).await?;
        let total = self.duplicate_repo.count_pending().await?;

        Ok(DuplicateListResponse {
            entries,
            total,
            limit,
            offset,
        })
    }

    /// 某次导入运行产生的全部条目（含已处理）
    pub async fn list_by_run(&self, run_id: &str) -> ApiResult<Vec<DuplicateEntry>> {
        if run_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("run_id 不能为空".to_string()));
        }
        Ok(self.duplicate_repo.list_by_run(run_id).await?)
    }

    pub async fn get_entry(&self, entry_id: &str) -> ApiResult<DuplicateEntry> {
        self.duplicate_repo
            .get_by_id(entry_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("DuplicateEntry(id={})不存在", entry_id)))
    }

    /// 处理单个重复条目
    ///
    /// # 说明
    /// - keep_existing: 仅标记，不修改商品
    /// - update_with_new: 认领条目与按 incoming_snapshot 覆盖商品在同一事务内完成
    /// - ignore: 仅标记，不比较不修改
    ///
    /// # 返回
    /// - Ok(DuplicateEntry): 处理后的条目
    /// - Err(AlreadyResolved): 条目已处理
    pub async fn resolve(
        &self,
        entry_id: &str,
        resolution: DuplicateResolution,
    ) -> ApiResult<DuplicateEntry> {
        let entry = self.get_entry(entry_id).await?;

        if let Some(existing) = entry.resolution {
            return Err(ApiError::AlreadyResolved {
                entry_id: entry_id.to_string(),
                resolution: existing.as_str().to_string(),
            });
        }

        if resolution == DuplicateResolution::UpdateWithNew {
            let item = self.incoming_item(&entry).await?;
            self.duplicate_repo
                .resolve_with_overwrite(entry_id, &item, Utc::now())
                .await?;
        } else {
            self.duplicate_repo
                .mark_resolved(entry_id, resolution, Utc::now())
                .await?;
        }

        info!(
            entry_id = %entry_id,
            sku = %entry.sku,
            resolution = resolution.as_str(),
            "重复条目已处理"
        );

        if resolution == DuplicateResolution::UpdateWithNew {
            self.events.publish(ImportEvent::refresh_all(
                &entry.run_id,
                ImportEventKind::DuplicateOverwritten,
            ));
        }

        self.get_entry(entry_id).await
    }

    /// 批量处理（逐条执行，允许部分失败）
    pub async fn batch_resolve(
        &self,
        entry_ids: &[String],
        resolution: DuplicateResolution,
    ) -> ApiResult<BatchResolveResponse> {
        if entry_ids.is_empty() {
            return Err(ApiError::InvalidInput("条目 ID 列表不能为空".to_string()));
        }

        let mut success_count = 0;
        let mut failed_ids = Vec::new();

        for entry_id in entry_ids {
            match self.resolve(entry_id, resolution).await {
                Ok(_) => success_count += 1,
                Err(e) => {
                    warn!(
                        entry_id = %entry_id,
                        resolution = resolution.as_str(),
                        error = %e,
                        "重复条目处理失败"
                    );
                    failed_ids.push(entry_id.clone());
                }
            }
        }

        let fail_count = failed_ids.len();
        Ok(BatchResolveResponse {
            success_count,
            fail_count,
            message: format!(
                "批量处理完成：成功 {} 条，失败 {} 条",
                success_count, fail_count
            ),
            failed_ids,
        })
    }

    /// 导出全部待处理条目为 CSV
    ///
    /// # 返回
    /// - Ok(usize): 导出的条目数
    pub async fn export_pending_csv<W: Write + Send>(&self, writer: W) -> ApiResult<usize> {
        let total = self.duplicate_repo.count_pending().await?;
        let entries = self.duplicate_repo.list_pending(total.max(1), 0).await?;

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record([
            "entry_id",
            "run_id",
            "sku",
            "existing_name",
            "incoming_name",
            "existing_quantity",
            "incoming_quantity",
            "difference_note",
            "created_at",
        ])?;

        for entry in &entries {
            csv_writer.write_record([
                entry.entry_id.clone(),
                entry.run_id.clone(),
                entry.sku.clone(),
                entry.existing_snapshot.name.clone(),
                entry.incoming_snapshot.name.clone(),
                entry.existing_snapshot.quantity.to_string(),
                entry.incoming_snapshot.quantity.to_string(),
                entry.difference_note.clone(),
                entry.created_at.to_rfc3339(),
            ])?;
        }

        csv_writer
            .flush()
            .map_err(|e| ApiError::InternalError(format!("CSV 写入失败: {}", e)))?;

        Ok(entries.len())
    }

    /// 由 incoming_snapshot 生成覆盖用商品（属性按需解析为 id）
    async fn incoming_item(&self, entry: &DuplicateEntry) -> ApiResult<NewItem> {
        let incoming = &entry.incoming_snapshot;

        let mut attribute_ids = BTreeMap::new();
        for (kind, value) in incoming.attributes.normalized().iter() {
            let id = self.attribute_repo.ensure(kind, value).await?;
            attribute_ids.insert(kind, id);
        }

        Ok(NewItem {
            item_id: String::new(), // 覆盖时保留原 item_id
            sku: incoming.sku.clone(),
            name: incoming.name.clone(),
            quantity: incoming.quantity,
            price: incoming.price,
            cost: incoming.cost,
            tax: incoming.tax,
            attribute_ids,
            created_at: Utc::now(),
        })
    }
}
