// ==========================================
// 商品批量导入系统 - 配置管理 API
// ==========================================
// 职责: 导入相关配置的查询与更新（写入前校验取值）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{config_keys, ConfigManager, ImportConfigReader};
use crate::domain::types::{ImportMode, QuantityUpdateStrategy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// 导入配置视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSettings {
    pub max_reported_errors: usize,
    pub quantity_update_strategy: QuantityUpdateStrategy,
    pub default_mode: ImportMode,
}

/// 配置管理 API
pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>) -> Self {
        Self { config_manager }
    }

    /// 当前生效的导入配置（未设置的键取默认值）
    pub async fn get_import_settings(&self) -> ApiResult<ImportSettings> {
        Ok(ImportSettings {
            max_reported_errors: self.config_manager.get_max_reported_errors().await?,
            quantity_update_strategy: self.config_manager.get_quantity_update_strategy().await?,
            default_mode: self.config_manager.get_default_import_mode().await?,
        })
    }

    /// 更新单个配置
    ///
    /// # 参数
    /// - key: 配置键（仅接受 import.* 已知键）
    /// - value: 配置值（按键类型校验）
    pub fn update_config(&self, key: &str, value: &str) -> ApiResult<()> {
        let normalized = match key {
            config_keys::MAX_REPORTED_ERRORS => {
                let parsed = value.trim().parse::<usize>().map_err(|_| {
                    ApiError::InvalidInput(format!("{} 必须为非负整数: {}", key, value))
                })?;
                parsed.to_string()
            }
            config_keys::QUANTITY_UPDATE_STRATEGY => value
                .parse::<QuantityUpdateStrategy>()
                .map_err(ApiError::InvalidInput)?
                .as_str()
                .to_string(),
            config_keys::DEFAULT_IMPORT_MODE => value
                .parse::<ImportMode>()
                .map_err(ApiError::InvalidInput)?
                .as_str()
                .to_string(),
            other => return Err(ApiError::InvalidInput(format!("未知配置键: {}", other))),
        };

        self.config_manager
            .set_global_config_value(key, &normalized)?;

        info!(key = %key, value = %normalized, "配置已更新");
        Ok(())
    }
}
