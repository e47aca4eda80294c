// ==========================================
// 商品批量导入系统 - API 层错误类型
// ==========================================
// 职责: 将仓储层 / 导入层错误转换为调用方可读的错误消息
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("重复条目已处理: entry_id={entry_id}, resolution={resolution}")]
    AlreadyResolved { entry_id: String, resolution: String },

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("数据验证失败: 共 {} 条错误", .errors.len())]
    ValidationError { errors: Vec<String> },

    #[error("属性创建失败: {0}")]
    AttributeCreationFailed(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::AlreadyResolved {
                entry_id,
                resolution,
            } => ApiError::AlreadyResolved {
                entry_id,
                resolution,
            },
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::SerializationError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::ValidationFailed { errors } => ApiError::ValidationError { errors },
            ImportError::AttributeCreation { .. } => {
                ApiError::AttributeCreationFailed(err.to_string())
            }
            ImportError::Repository(repo_err) => repo_err.into(),
            ImportError::Other(err) => ApiError::Other(err),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

impl From<csv::Error> for ApiError {
    fn from(err: csv::Error) -> Self {
        ApiError::InternalError(format!("CSV 写入失败: {}", err))
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_resolved_maps_through() {
        let err: ApiError = RepositoryError::AlreadyResolved {
            entry_id: "e1".to_string(),
            resolution: "ignore".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::AlreadyResolved { ref entry_id, .. } if entry_id == "e1"));
    }

    #[test]
    fn test_validation_failed_keeps_errors() {
        let err: ApiError = ImportError::ValidationFailed {
            errors: vec!["行 1: SKU 不能为空".to_string()],
        }
        .into();
        match err {
            ApiError::ValidationError { errors } => assert_eq!(errors.len(), 1),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_file_errors_become_import_error() {
        let err: ApiError = ImportError::UnsupportedFormat("json".to_string()).into();
        assert!(matches!(err, ApiError::ImportError(msg) if msg.contains("json")));

        let err: ApiError = ImportError::Repository(RepositoryError::NotFound {
            entity: "Item".to_string(),
            id: "A".to_string(),
        })
        .into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
