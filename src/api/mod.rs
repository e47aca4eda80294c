// ==========================================
// 商品批量导入系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供 UI 层调用
// ==========================================

pub mod config_api;
pub mod duplicate_api;
pub mod error;
pub mod import_api;

// 重导出核心类型
pub use config_api::{ConfigApi, ImportSettings};
pub use duplicate_api::{BatchResolveResponse, DuplicateApi, DuplicateListResponse};
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, ImportApiResponse, ImportApiStep};
