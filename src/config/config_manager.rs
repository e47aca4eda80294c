// ==========================================
// 商品批量导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::types::{ImportMode, QuantityUpdateStrategy};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// 配置键
pub mod config_keys {
    pub const MAX_REPORTED_ERRORS: &str = "import.max_reported_errors";
    pub const QUANTITY_UPDATE_STRATEGY: &str = "import.quantity_update_strategy";
    pub const DEFAULT_IMPORT_MODE: &str = "import.default_mode";
}

/// 默认展示错误条数
pub const DEFAULT_MAX_REPORTED_ERRORS: usize = 10;

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;

        Ok(())
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> RepositoryResult<HashMap<String, String>> {
        let conn = self.get_conn()?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt
            .query_map(params![GLOBAL_SCOPE], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(rows)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
// 配置值格式错误时回退默认值并告警，不阻断导入
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_max_reported_errors(&self) -> RepositoryResult<usize> {
        let value = self.get_config_or_default(
            config_keys::MAX_REPORTED_ERRORS,
            &DEFAULT_MAX_REPORTED_ERRORS.to_string(),
        )?;

        Ok(value.trim().parse::<usize>().unwrap_or_else(|_| {
            tracing::warn!(
                config_key = config_keys::MAX_REPORTED_ERRORS,
                raw_value = %value,
                "错误展示条数配置格式错误，使用默认值"
            );
            DEFAULT_MAX_REPORTED_ERRORS
        }))
    }

    async fn get_quantity_update_strategy(&self) -> RepositoryResult<QuantityUpdateStrategy> {
        let value = self.get_config_or_default(config_keys::QUANTITY_UPDATE_STRATEGY, "BATCH")?;

        Ok(value.parse().unwrap_or_else(|e: String| {
            tracing::warn!(
                config_key = config_keys::QUANTITY_UPDATE_STRATEGY,
                error = %e,
                "数量更新策略配置错误，使用 BATCH"
            );
            QuantityUpdateStrategy::Batch
        }))
    }

    async fn get_default_import_mode(&self) -> RepositoryResult<ImportMode> {
        let value = self.get_config_or_default(config_keys::DEFAULT_IMPORT_MODE, "FULL")?;

        Ok(value.parse().unwrap_or_else(|e: String| {
            tracing::warn!(
                config_key = config_keys::DEFAULT_IMPORT_MODE,
                error = %e,
                "默认导入模式配置错误，使用 FULL"
            );
            ImportMode::Full
        }))
    }
}
