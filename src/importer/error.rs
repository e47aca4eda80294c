// ==========================================
// 商品批量导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 文件格式 / 校验 / 属性创建 / 存储
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误（校验之前即终止） =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv/.tsv/.txt/.xlsx/.xlsm/.xls/.ods）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 校验错误（整批终止） =====
    #[error("数据校验失败，共 {} 条错误", .errors.len())]
    ValidationFailed { errors: Vec<String> },

    // ===== 属性物化错误 =====
    #[error("属性创建失败（{} 个待创建值: {}）: {message}", .values.len(), .values.join(", "))]
    AttributeCreation {
        values: Vec<String>,
        message: String,
    },

    // ===== 存储错误 =====
    #[error("存储访问失败: {0}")]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 校验错误明细（非校验错误返回空切片）
    pub fn validation_errors(&self) -> &[String] {
        match self {
            ImportError::ValidationFailed { errors } => errors,
            _ => &[],
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_failed_message() {
        let err = ImportError::ValidationFailed {
            errors: vec!["行 1: SKU 为空".to_string(), "行 2: 数量为负".to_string()],
        };
        assert_eq!(err.to_string(), "数据校验失败，共 2 条错误");
        assert_eq!(err.validation_errors().len(), 2);
    }

    #[test]
    fn test_attribute_creation_message() {
        let err = ImportError::AttributeCreation {
            values: vec!["Color: TEAL".to_string()],
            message: "disk full".to_string(),
        };
        assert!(err.to_string().contains("1 个待创建值: Color: TEAL"));
        assert!(err.validation_errors().is_empty());
    }

    #[test]
    fn test_repository_error_wraps() {
        let err: ImportError = RepositoryError::LockError("poisoned".to_string()).into();
        assert!(matches!(err, ImportError::Repository(_)));
    }
}
