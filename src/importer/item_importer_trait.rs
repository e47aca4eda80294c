// ==========================================
// 商品批量导入系统 - 导入管道 Trait
// ==========================================
// 职责: 定义导入主接口与各阶段组件接口（不包含实现）
// 流程: 解析 → 行校验 → 属性预检 → 确认闸门 → 属性物化 → 重复分类/落库
// ==========================================

use crate::domain::import::ImportOutcome;
use crate::domain::item::{RawRow, SourceRow, ValidatedItemRecord};
use crate::domain::types::ImportMode;
use crate::importer::error::ImportResult;
use crate::importer::run_context::{ImportProgress, PendingImport};
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// 导入选项 / 阶段结果
// ==========================================

/// 单次导入的调用参数
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// 导入模式（None 时读取配置 import.default_mode）
    pub mode: Option<ImportMode>,
    /// 进度句柄（调用方可在其他任务中轮询）
    pub progress: Option<ImportProgress>,
}

impl ImportOptions {
    pub fn with_mode(mode: ImportMode) -> Self {
        Self {
            mode: Some(mode),
            progress: None,
        }
    }

    pub fn progress(mut self, progress: ImportProgress) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// 导入推进结果
#[derive(Debug)]
pub enum ImportStep {
    /// 存在新属性值，等待操作员确认（调用方持有挂起的运行）
    AwaitingConfirmation(PendingImport),
    /// 运行结束
    Completed(ImportOutcome),
}

impl ImportStep {
    pub fn is_awaiting_confirmation(&self) -> bool {
        matches!(self, ImportStep::AwaitingConfirmation(_))
    }
}

// ==========================================
// ItemImporter Trait
// ==========================================
// 用途: 商品导入主接口
// 实现者: ItemImporterImpl
#[async_trait]
pub trait ItemImporter: Send + Sync {
    /// 从文件导入（CSV / Excel）
    ///
    /// # 返回
    /// - Ok(ImportStep::AwaitingConfirmation): 有新属性值待确认
    /// - Ok(ImportStep::Completed): 无需确认，已完成
    /// - Err(ImportError::ValidationFailed): 任一行校验失败，整批终止
    /// - Err: 文件格式错误 / 存储错误
    async fn import_file(&self, file_path: &Path, options: ImportOptions)
        -> ImportResult<ImportStep>;

    /// 从外部提供的行数组导入（例如表格粘贴）
    async fn import_rows(&self, rows: Vec<RawRow>, options: ImportOptions)
        -> ImportResult<ImportStep>;

    /// 确认挂起运行中的新属性值，继续物化与落库
    async fn confirm(&self, pending: PendingImport) -> ImportResult<ImportOutcome>;

    /// 取消挂起的运行（不写入任何数据）
    ///
    /// # 返回
    /// - 被取消运行的 run_id
    async fn cancel(&self, pending: PendingImport) -> String;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口
// 实现者: CsvParser, ExcelParser, UniversalFileParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行（表头 → 未定型值）
    ///
    /// # 返回
    /// - Ok(Vec<SourceRow>): 行记录列表（已跳过全空行，行号为文件中的物理行号）
    /// - Err: 文件不存在 / 扩展名不支持 / 内容解析失败
    fn parse_rows(&self, file_path: &Path) -> ImportResult<Vec<SourceRow>>;
}

// ==========================================
// RowValidator Trait
// ==========================================
// 用途: 行校验接口（全有或全无）
// 实现者: ItemRowValidator
pub trait RowValidator: Send + Sync {
    /// 校验并定型整批原始行
    ///
    /// # 返回
    /// - Ok(Vec<ValidatedItemRecord>): 全部行校验通过
    /// - Err(ImportError::ValidationFailed): 至少一行不合法（包含所有行的错误明细）
    fn validate(&self, rows: &[SourceRow]) -> ImportResult<Vec<ValidatedItemRecord>>;
}
