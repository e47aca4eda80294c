// ==========================================
// 商品批量导入系统 - 参考属性 Repository 实现
// ==========================================
// 职责: 实现参考表数据访问（使用 rusqlite）
// 说明: 表名来自 AttributeKind 的编译期常量，名称值一律参数化
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::import::PendingAttributeValue;
use crate::domain::types::AttributeKind;
use crate::repository::attribute_repo::AttributeRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

fn find_id_sql(kind: AttributeKind) -> String {
    format!(
        "SELECT id FROM {table} WHERE {column} = ?1 COLLATE NOCASE",
        table = kind.reference_table(),
        column = kind.reference_column()
    )
}

fn insert_sql(kind: AttributeKind) -> String {
    format!(
        "INSERT INTO {table} ({column}, created_at) VALUES (?1, ?2)",
        table = kind.reference_table(),
        column = kind.reference_column()
    )
}

fn upsert_sql(kind: AttributeKind) -> String {
    format!(
        "INSERT INTO {table} ({column}, created_at) VALUES (?1, ?2) ON CONFLICT({column}) DO NOTHING",
        table = kind.reference_table(),
        column = kind.reference_column()
    )
}

// ==========================================
// AttributeRepositoryImpl
// ==========================================
pub struct AttributeRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl AttributeRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl AttributeRepository for AttributeRepositoryImpl {
    async fn find_id(&self, kind: AttributeKind, name: &str) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        let id = conn
            .query_row(&find_id_sql(kind), params![name], |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    async fn create_confirmed(
        &self,
        values: &[PendingAttributeValue],
    ) -> RepositoryResult<Vec<(PendingAttributeValue, i64)>> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();

        let mut created = Vec::with_capacity(values.len());
        for value in values {
            // 二次检查：预检之后可能已被其他操作员创建
            let existing: Option<i64> = tx
                .query_row(
                    &find_id_sql(value.kind),
                    params![value.normalized_value],
                    |row| row.get(0),
                )
                .optional()?;

            let id = match existing {
                Some(id) => {
                    warn!(
                        table = value.kind.reference_table(),
                        value = %value.normalized_value,
                        id = id,
                        "属性值在确认期间已被创建，复用现有记录"
                    );
                    id
                }
                None => {
                    tx.execute(&insert_sql(value.kind), params![value.normalized_value, now])?;
                    tx.last_insert_rowid()
                }
            };

            debug!(table = value.kind.reference_table(), value = %value.normalized_value, id = id, "属性值已物化");
            created.push((value.clone(), id));
        }

        tx.commit()?;
        Ok(created)
    }

    async fn ensure(&self, kind: AttributeKind, name: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        conn.execute(&upsert_sql(kind), params![name, Utc::now().to_rfc3339()])?;

        let id = conn
            .query_row(&find_id_sql(kind), params![name], |row| row.get(0))
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: kind.reference_table().to_string(),
                id: name.to_string(),
            })?;

        Ok(id)
    }

    async fn count(&self, kind: AttributeKind) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT COUNT(*) FROM {}", kind.reference_table());
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
