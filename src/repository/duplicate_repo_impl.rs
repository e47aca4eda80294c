// ==========================================
// 商品批量导入系统 - 重复队列 Repository 实现
// ==========================================
// 职责: 实现 duplicate_entries 数据访问（使用 rusqlite）
// 存储: 快照以 JSON 文本落库，resolution 以 snake_case 文本落库
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::import::DuplicateEntry;
use crate::domain::item::NewItem;
use crate::domain::types::DuplicateResolution;
use crate::repository::duplicate_repo::DuplicateRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::item_repo_impl::overwrite_item;
use crate::repository::parse_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const SELECT_COLUMNS: &str = r#"
    SELECT entry_id, run_id, sku, existing_snapshot_json, incoming_snapshot_json,
           difference_note, resolution, resolved_at, created_at
    FROM duplicate_entries
"#;

/// 原始行（JSON 尚未解析）
struct DuplicateEntryRow {
    entry_id: String,
    run_id: String,
    sku: String,
    existing_json: String,
    incoming_json: String,
    difference_note: String,
    resolution: Option<String>,
    resolved_at: Option<String>,
    created_at: String,
}

impl DuplicateEntryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            entry_id: row.get(0)?,
            run_id: row.get(1)?,
            sku: row.get(2)?,
            existing_json: row.get(3)?,
            incoming_json: row.get(4)?,
            difference_note: row.get(5)?,
            resolution: row.get(6)?,
            resolved_at: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn into_entry(self) -> RepositoryResult<DuplicateEntry> {
        let resolution = match self.resolution {
            Some(raw) => Some(raw.parse::<DuplicateResolution>().map_err(|message| {
                RepositoryError::FieldValueError {
                    field: "resolution".to_string(),
                    message,
                }
            })?),
            None => None,
        };

        Ok(DuplicateEntry {
            entry_id: self.entry_id,
            run_id: self.run_id,
            sku: self.sku,
            existing_snapshot: serde_json::from_str(&self.existing_json)?,
            incoming_snapshot: serde_json::from_str(&self.incoming_json)?,
            difference_note: self.difference_note,
            resolution,
            resolved_at: self.resolved_at.as_deref().map(parse_rfc3339),
            created_at: parse_rfc3339(&self.created_at),
        })
    }
}

// ==========================================
// DuplicateRepositoryImpl
// ==========================================
pub struct DuplicateRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl DuplicateRepositoryImpl {
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

    fn query_entries(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepositoryResult<Vec<DuplicateEntry>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, DuplicateEntryRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(DuplicateEntryRow::into_entry).collect()
    }

    /// 条件更新认领条目（resolution IS NULL 才生效）
    fn claim(
        conn: &Connection,
        entry_id: &str,
        resolution: DuplicateResolution,
        resolved_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let affected = conn.execute(
            r#"
            UPDATE duplicate_entries
            SET resolution = ?1, resolved_at = ?2
            WHERE entry_id = ?3 AND resolution IS NULL
            "#,
            params![resolution.as_str(), resolved_at.to_rfc3339(), entry_id],
        )?;

        if affected == 1 {
            return Ok(());
        }

        let current: Option<Option<String>> = conn
            .query_row(
                "SELECT resolution FROM duplicate_entries WHERE entry_id = ?1",
                params![entry_id],
                |row| row.get(0),
            )
            .optional()?;

        match current {
            None => Err(RepositoryError::NotFound {
                entity: "DuplicateEntry".to_string(),
                id: entry_id.to_string(),
            }),
            Some(existing) => Err(RepositoryError::AlreadyResolved {
                entry_id: entry_id.to_string(),
                resolution: existing.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl DuplicateRepository for DuplicateRepositoryImpl {
    async fn batch_insert_entries(&self, entries: Vec<DuplicateEntry>) -> RepositoryResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut stmt = tx.prepare(
            r#"
            INSERT INTO duplicate_entries (
                entry_id, run_id, sku, existing_snapshot_json, incoming_snapshot_json,
                difference_note, resolution, resolved_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )?;

        let mut count = 0;
        for entry in &entries {
            stmt.execute(params![
                entry.entry_id,
                entry.run_id,
                entry.sku,
                serde_json::to_string(&entry.existing_snapshot)?,
                serde_json::to_string(&entry.incoming_snapshot)?,
                entry.difference_note,
                entry.resolution.map(|r| r.as_str()),
                entry.resolved_at.map(|t| t.to_rfc3339()),
                entry.created_at.to_rfc3339(),
            ])?;
            count += 1;
        }

        drop(stmt);

        tx.commit()?;
        Ok(count)
    }

    async fn mark_resolved(
        &self,
        entry_id: &str,
        resolution: DuplicateResolution,
        resolved_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::claim(&conn, entry_id, resolution, resolved_at)
    }

    async fn resolve_with_overwrite(
        &self,
        entry_id: &str,
        item: &NewItem,
        resolved_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        // 认领失败时 tx 被丢弃并回滚
        Self::claim(&tx, entry_id, DuplicateResolution::UpdateWithNew, resolved_at)?;
        overwrite_item(&tx, item)?;

        tx.commit()?;
        debug!(entry_id = %entry_id, sku = %item.sku, "重复条目已认领并覆盖商品");
        Ok(())
    }

    async fn list_pending(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<DuplicateEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE resolution IS NULL ORDER BY created_at ASC, sku ASC LIMIT ?1 OFFSET ?2",
            SELECT_COLUMNS
        );
        Self::query_entries(&conn, &sql, params![limit, offset])
    }

    async fn count_pending(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM duplicate_entries WHERE resolution IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    async fn list_by_run(&self, run_id: &str) -> RepositoryResult<Vec<DuplicateEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE run_id = ?1 ORDER BY sku ASC", SELECT_COLUMNS);
        Self::query_entries(&conn, &sql, params![run_id])
    }

    async fn get_by_id(&self, entry_id: &str) -> RepositoryResult<Option<DuplicateEntry>> {
        let conn = self.get_conn()?;

        let row = conn
            .query_row(
                &format!("{} WHERE entry_id = ?1", SELECT_COLUMNS),
                params![entry_id],
                DuplicateEntryRow::from_row,
            )
            .optional()?;

        row.map(DuplicateEntryRow::into_entry).transpose()
    }
}
