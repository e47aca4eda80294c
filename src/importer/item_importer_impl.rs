// ==========================================
// 商品批量导入系统 - 商品导入器实现
// ==========================================
// 职责: 串联导入管道各阶段，从原始行到落库
// 流程: 行校验 → 属性预检 → 确认闸门 → 属性物化 → 重复分类 → 落库 → 刷新通知
// 进度: 校验 0-10 / 预检 10-40 / 物化 40-55 / 分类与落库 55-99 / 完成 100
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::import::{DuplicateEntry, ImportOutcome};
use crate::domain::item::{ItemSnapshot, NewItem, RawRow, SourceRow, ValidatedItemRecord};
use crate::domain::types::{AttributeKind, QuantityUpdateStrategy};
use crate::events::{ImportEvent, ImportEventKind, OptionalEventPublisher};
use crate::importer::attribute_materializer::AttributeMaterializer;
use crate::importer::attribute_resolver::AttributeResolver;
use crate::importer::duplicate_classifier::DuplicateClassifier;
use crate::importer::error::ImportResult;
use crate::importer::item_importer_trait::{
    FileParser, ImportOptions, ImportStep, ItemImporter, RowValidator,
};
use crate::importer::run_context::{AttributeCache, ImportRunContext, PendingImport};
use crate::repository::error::RepositoryResult;
use crate::repository::{AttributeRepository, DuplicateRepository, ItemRepository};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// 行校验完成时的进度
const VALIDATED_PROGRESS: u8 = 10;
/// 分类与落库阶段进度区间
const MUTATION_PROGRESS: (u8, u8) = (55, 99);

// ==========================================
// ItemImporterImpl - 商品导入器实现
// ==========================================
pub struct ItemImporterImpl {
    // 数据访问层
    item_repo: Arc<dyn ItemRepository>,
    duplicate_repo: Arc<dyn DuplicateRepository>,

    // 配置读取器
    config: Arc<dyn ImportConfigReader>,

    // 导入组件
    file_parser: Box<dyn FileParser>,
    row_validator: Box<dyn RowValidator>,
    resolver: AttributeResolver,
    materializer: AttributeMaterializer,

    // 刷新通知
    events: OptionalEventPublisher,
}

impl ItemImporterImpl {
    /// 创建新的 ItemImporter 实例
    ///
    /// # 参数
    /// - item_repo: 商品仓储
    /// - attribute_repo: 参考属性仓储（预检 / 物化 / 按需解析共用）
    /// - duplicate_repo: 重复队列仓储
    /// - config: 配置读取器
    /// - file_parser: 文件解析器
    /// - row_validator: 行校验器
    pub fn new(
        item_repo: Arc<dyn ItemRepository>,
        attribute_repo: Arc<dyn AttributeRepository>,
        duplicate_repo: Arc<dyn DuplicateRepository>,
        config: Arc<dyn ImportConfigReader>,
        file_parser: Box<dyn FileParser>,
        row_validator: Box<dyn RowValidator>,
    ) -> Self {
        Self {
            item_repo,
            duplicate_repo,
            config,
            file_parser,
            row_validator,
            resolver: AttributeResolver::new(attribute_repo.clone()),
            materializer: AttributeMaterializer::new(attribute_repo),
            events: OptionalEventPublisher::none(),
        }
    }

    /// 注入刷新事件发布者
    pub fn with_event_publisher(mut self, events: OptionalEventPublisher) -> Self {
        self.events = events;
        self
    }

    /// 行校验 + 属性预检；有新值时挂起
    async fn start_run(
        &self,
        rows: Vec<SourceRow>,
        options: ImportOptions,
    ) -> ImportResult<ImportStep> {
        let mode = match options.mode {
            Some(mode) => mode,
            None => self.config.get_default_import_mode().await?,
        };
        // 落库开始后不再读取配置
        let quantity_strategy = self.config.get_quantity_update_strategy().await?;
        let progress = options.progress.unwrap_or_default();

        info!(mode = %mode, rows = rows.len(), "开始导入商品数据");

        // === 步骤 1: 行校验（整批全有或全无） ===
        let records = self.row_validator.validate(&rows)?;
        progress.advance_to(VALIDATED_PROGRESS);

        let mut context = ImportRunContext::new(mode, records, progress)
            .with_quantity_strategy(quantity_strategy);
        info!(run_id = %context.run_id, total = context.total(), "行校验通过");

        // === 步骤 2: 属性预检 ===
        self.resolver.precheck(&mut context).await?;

        // === 步骤 3: 确认闸门 ===
        if !context.pending.is_empty() {
            info!(
                run_id = %context.run_id,
                pending = context.pending.len(),
                "存在新属性值，等待操作员确认"
            );
            return Ok(ImportStep::AwaitingConfirmation(PendingImport::new(context)));
        }

        debug!(run_id = %context.run_id, "无新属性值，跳过确认");
        let outcome = self.finish_run(context).await?;
        Ok(ImportStep::Completed(outcome))
    }

    /// 按需解析一行的 9 维属性并构建待插入商品
    async fn build_new_item(
        &self,
        cache: &mut AttributeCache,
        record: &ValidatedItemRecord,
    ) -> RepositoryResult<NewItem> {
        let mut attribute_ids = BTreeMap::new();
        for kind in AttributeKind::ALL {
            let Some(raw) = record.attributes.get(kind) else {
                continue;
            };
            if let Some(id) = self.resolver.resolve(cache, kind, raw).await? {
                attribute_ids.insert(kind, id);
            }
        }

        Ok(NewItem {
            item_id: uuid::Uuid::new_v4().to_string(),
            sku: record.sku.clone(),
            name: record.name.clone(),
            quantity: record.quantity,
            price: record.price,
            cost: record.cost,
            tax: record.tax,
            attribute_ids,
            created_at: Utc::now(),
        })
    }

    /// 数量覆盖（按配置选择单事务批量或逐行并发）
    async fn apply_quantity_updates(
        &self,
        strategy: QuantityUpdateStrategy,
        updates: Vec<(String, i64)>,
        outcome: &mut ImportOutcome,
    ) {
        if updates.is_empty() {
            return;
        }

        let count = updates.len();

        match strategy {
            QuantityUpdateStrategy::Batch => {
                match self.item_repo.batch_update_quantities(updates).await {
                    Ok(updated) => outcome.success += updated,
                    Err(e) => {
                        error!(error = %e, count = count, "批量数量更新失败，已回滚");
                        outcome.failed += count;
                        outcome
                            .errors
                            .push(format!("批量数量更新失败（{} 行）: {}", count, e));
                    }
                }
            }
            QuantityUpdateStrategy::PerRow => {
                let results = join_all(
                    updates
                        .iter()
                        .map(|(sku, quantity)| self.item_repo.update_quantity(sku, *quantity)),
                )
                .await;

                for ((sku, _), result) in updates.iter().zip(results) {
                    match result {
                        Ok(()) => outcome.success += 1,
                        Err(e) => {
                            warn!(sku = %sku, error = %e, "数量更新失败");
                            outcome.failed += 1;
                            outcome.errors.push(format!("SKU {} 数量更新失败: {}", sku, e));
                        }
                    }
                }
            }
        }

        debug!(strategy = strategy.as_str(), count = count, "数量更新完成");
    }

    /// 重复分类 + 落库，产出导入结果
    #[instrument(skip(self, context), fields(run_id = %context.run_id, mode = %context.mode))]
    async fn finish_run(&self, context: ImportRunContext) -> ImportResult<ImportOutcome> {
        let ImportRunContext {
            run_id,
            mode,
            quantity_strategy,
            records,
            mut cache,
            progress,
            started_at,
            ..
        } = context;

        let mut outcome = ImportOutcome::new(run_id.clone(), mode, records.len());

        // === 步骤 5: 一次查询取回全部已存在 SKU ===
        let skus: Vec<String> = records.iter().map(|r| r.sku.clone()).collect();
        let existing = self.item_repo.find_snapshots_by_skus(&skus).await?;
        debug!(existing = existing.len(), "已存在 SKU 查询完成");

        let plan = DuplicateClassifier::plan(mode, &records, &existing);
        let (start, end) = MUTATION_PROGRESS;
        let total = plan.len();
        let mut done = 0;

        // === 步骤 6a: FULL 模式重复 → 重复队列 ===
        if !plan.deferred.is_empty() {
            let entries: Vec<DuplicateEntry> = plan
                .deferred
                .iter()
                .map(|(existing, record)| {
                    DuplicateEntry::new(&run_id, existing.clone(), ItemSnapshot::from_record(record))
                })
                .collect();
            let count = entries.len();

            outcome.duplicates += count;
            outcome.failed += count;

            match self.duplicate_repo.batch_insert_entries(entries).await {
                Ok(queued) => outcome.queued += queued,
                Err(e) => {
                    error!(error = %e, count = count, "重复条目写入失败，未入队");
                    for (_, record) in &plan.deferred {
                        outcome.errors.push(format!(
                            "行 {}: SKU {} 已存在，但未写入重复队列: {}",
                            record.row_number, record.sku, e
                        ));
                    }
                }
            }
            done += count;
            progress.advance_within(start, end, done, total);
        }

        // === 步骤 6b: NEW_ONLY 模式重复 → 拒绝 ===
        for record in &plan.rejected {
            outcome.duplicates += 1;
            outcome.failed += 1;
            outcome.errors.push(format!(
                "行 {}: SKU {} 已存在，NEW_ONLY 模式拒绝导入",
                record.row_number, record.sku
            ));
        }
        done += plan.rejected.len();

        // === 步骤 6c: QUANTITY_ONLY 模式新 SKU → 跳过 ===
        outcome.skipped += plan.skipped.len();
        done += plan.skipped.len();
        progress.advance_within(start, end, done, total);

        // === 步骤 6d: 新商品 → 解析属性并入队 ===
        let mut queued = Vec::with_capacity(plan.inserts.len());
        for record in &plan.inserts {
            match self.build_new_item(&mut cache, record).await {
                Ok(item) => {
                    queued.push(item);
                    outcome.success += 1;
                }
                Err(e) => {
                    warn!(sku = %record.sku, error = %e, "属性解析失败，跳过该行");
                    outcome.failed += 1;
                    outcome.errors.push(format!(
                        "行 {}: SKU {} 属性解析失败: {}",
                        record.row_number, record.sku, e
                    ));
                }
            }
            done += 1;
            progress.advance_within(start, end, done, total);
        }

        // === 步骤 7: 批量插入（失败时按行数回退计数） ===
        if !queued.is_empty() {
            let count = queued.len();
            match self.item_repo.batch_insert_items(queued).await {
                Ok(inserted) => debug!(inserted = inserted, "批量插入完成"),
                Err(e) => {
                    error!(error = %e, count = count, "批量插入失败，已回滚");
                    outcome.success -= count;
                    outcome.failed += count;
                    outcome
                        .errors
                        .push(format!("批量插入失败（{} 行）: {}", count, e));
                }
            }
        }

        // === 步骤 8: 数量覆盖 ===
        let update_count = plan.quantity_updates.len();
        self.apply_quantity_updates(quantity_strategy, plan.quantity_updates, &mut outcome)
            .await;
        done += update_count;
        progress.advance_within(start, end, done, total);

        outcome.elapsed_ms = started_at.elapsed().as_millis() as u64;
        progress.finish();

        info!(
            total = outcome.total,
            success = outcome.success,
            failed = outcome.failed,
            duplicates = outcome.duplicates,
            queued = outcome.queued,
            skipped = outcome.skipped,
            elapsed_ms = outcome.elapsed_ms,
            "导入完成"
        );

        // === 步骤 9: 通知下游刷新 ===
        if outcome.has_mutations() {
            self.events
                .publish(ImportEvent::refresh_all(&run_id, ImportEventKind::ImportCompleted));
        }

        Ok(outcome)
    }
}

#[async_trait]
impl ItemImporter for ItemImporterImpl {
    #[instrument(skip(self, file_path, options), fields(file_path = %file_path.display()))]
    async fn import_file(
        &self,
        file_path: &Path,
        options: ImportOptions,
    ) -> ImportResult<ImportStep> {
        let rows = self.file_parser.parse_rows(file_path).map_err(|e| {
            error!(error = %e, "文件解析失败");
            e
        })?;
        info!(rows = rows.len(), "文件解析完成");

        self.start_run(rows, options).await
    }

    async fn import_rows(
        &self,
        rows: Vec<RawRow>,
        options: ImportOptions,
    ) -> ImportResult<ImportStep> {
        self.start_run(SourceRow::numbered(rows), options).await
    }

    async fn confirm(&self, pending: PendingImport) -> ImportResult<ImportOutcome> {
        let mut context = pending.into_context();
        info!(
            run_id = %context.run_id,
            pending = context.pending.len(),
            "操作员已确认新属性值"
        );

        self.materializer.materialize(&mut context).await?;
        self.finish_run(context).await
    }

    async fn cancel(&self, pending: PendingImport) -> String {
        let run_id = pending.run_id().to_string();
        info!(
            run_id = %run_id,
            pending = pending.prompts().len(),
            "操作员取消导入，未写入任何数据"
        );
        run_id
    }
}
