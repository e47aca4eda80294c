// ==========================================
// 商品批量导入系统 - 导入 API
// ==========================================
// 职责: 封装导入管道，供 UI 层调用（文件导入 / 粘贴行导入 / 确认 / 取消）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader, DEFAULT_MAX_REPORTED_ERRORS};
use crate::db::{default_db_path, init_schema, open_sqlite_connection};
use crate::domain::import::ImportOutcome;
use crate::domain::item::RawRow;
use crate::domain::types::ImportMode;
use crate::events::OptionalEventPublisher;
use crate::importer::{
    ImportOptions, ImportProgress, ImportStep, ItemImporter, ItemImporterImpl, ItemRowValidator,
    PendingImport, UniversalFileParser,
};
use crate::repository::{AttributeRepositoryImpl, DuplicateRepositoryImpl, ItemRepositoryImpl};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// 导入完成响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportApiResponse {
    /// 完整导入结果
    pub outcome: ImportOutcome,
    /// 展示用错误摘要（前 N 条 + 截断提示）
    pub error_summary: Vec<String>,
}

/// 导入推进结果（API 视图）
#[derive(Debug)]
pub enum ImportApiStep {
    /// 等待操作员确认新属性值；通过 `PendingImport::prompts()` 展示
    AwaitingConfirmation(PendingImport),
    /// 已完成
    Completed(ImportApiResponse),
}

/// 导入 API
pub struct ImportApi {
    importer: Arc<dyn ItemImporter>,
    config: Arc<dyn ImportConfigReader>,
}

impl ImportApi {
    /// 由已组装好的导入器创建
    pub fn new(importer: Arc<dyn ItemImporter>, config: Arc<dyn ImportConfigReader>) -> Self {
        Self { importer, config }
    }

    /// 基于默认数据库路径创建（ITEM_IMPORT_DB_PATH 或用户数据目录）
    pub fn open_default(events: OptionalEventPublisher) -> ApiResult<Self> {
        let db_path = default_db_path();
        info!(db_path = %db_path, "使用默认数据库路径");
        Self::from_db_path(&db_path, events)
    }

    /// 基于数据库文件创建（全部仓储共享同一连接；表结构幂等创建）
    pub fn from_db_path(db_path: &str, events: OptionalEventPublisher) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(format!("{}: {}", db_path, e)))?;
        init_schema(&conn).map_err(|e| ApiError::DatabaseError(format!("初始化表结构失败: {}", e)))?;
        Self::from_connection(Arc::new(Mutex::new(conn)), events)
    }

    /// 基于共享连接创建
    pub fn from_connection(
        conn: Arc<Mutex<Connection>>,
        events: OptionalEventPublisher,
    ) -> ApiResult<Self> {
        let config = Arc::new(ConfigManager::from_connection(conn.clone())?);

        let importer = ItemImporterImpl::new(
            Arc::new(ItemRepositoryImpl::from_connection(conn.clone())),
            Arc::new(AttributeRepositoryImpl::from_connection(conn.clone())),
            Arc::new(DuplicateRepositoryImpl::from_connection(conn)),
            config.clone(),
            Box::new(UniversalFileParser),
            Box::new(ItemRowValidator::new()),
        )
        .with_event_publisher(events);

        Ok(Self::new(Arc::new(importer), config))
    }

    /// 从文件导入
    ///
    /// # 参数
    /// - file_path: 文件路径（.csv/.tsv/.txt/.xlsx/.xlsm/.xls/.ods）
    /// - mode: 导入模式（None 使用配置默认值）
    /// - progress: 进度句柄（可选）
    pub async fn import_file(
        &self,
        file_path: &str,
        mode: Option<ImportMode>,
        progress: Option<ImportProgress>,
    ) -> ApiResult<ImportApiStep> {
        if file_path.trim().is_empty() {
            return Err(ApiError::InvalidInput("文件路径不能为空".to_string()));
        }

        let options = ImportOptions { mode, progress };
        let step = self
            .importer
            .import_file(Path::new(file_path), options)
            .await?;
        self.to_api_step(step).await
    }

    /// 从粘贴的表格行导入
    pub async fn import_rows(
        &self,
        rows: Vec<RawRow>,
        mode: Option<ImportMode>,
        progress: Option<ImportProgress>,
    ) -> ApiResult<ImportApiStep> {
        let options = ImportOptions { mode, progress };
        let step = self.importer.import_rows(rows, options).await?;
        self.to_api_step(step).await
    }

    /// 确认新属性值并完成导入
    pub async fn confirm(&self, pending: PendingImport) -> ApiResult<ImportApiResponse> {
        let outcome = self.importer.confirm(pending).await?;
        Ok(self.to_response(outcome).await)
    }

    /// 取消挂起的导入
    ///
    /// # 返回
    /// - 被取消运行的 run_id
    pub async fn cancel(&self, pending: PendingImport) -> String {
        self.importer.cancel(pending).await
    }

    async fn to_api_step(&self, step: ImportStep) -> ApiResult<ImportApiStep> {
        match step {
            ImportStep::AwaitingConfirmation(pending) => {
                Ok(ImportApiStep::AwaitingConfirmation(pending))
            }
            ImportStep::Completed(outcome) => {
                Ok(ImportApiStep::Completed(self.to_response(outcome).await))
            }
        }
    }

    /// 导入已落库，配置读取失败时只降级摘要长度
    async fn to_response(&self, outcome: ImportOutcome) -> ImportApiResponse {
        let limit = match self.config.get_max_reported_errors().await {
            Ok(limit) => limit,
            Err(e) => {
                warn!(
                    run_id = %outcome.run_id,
                    error = %e,
                    fallback = DEFAULT_MAX_REPORTED_ERRORS,
                    "读取错误摘要上限失败，使用默认值"
                );
                DEFAULT_MAX_REPORTED_ERRORS
            }
        };
        let error_summary = outcome.error_summary(limit);
        ImportApiResponse {
            outcome,
            error_summary,
        }
    }
}
