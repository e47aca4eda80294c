// ==========================================
// 商品批量导入系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发导入时的偶发 busy 错误
// - 幂等建表（items / 9 张参考表 / duplicate_entries / config_kv）
// ==========================================

use crate::domain::types::AttributeKind;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 默认数据库路径
///
/// 优先读取环境变量 ITEM_IMPORT_DB_PATH，其次使用用户数据目录
pub fn default_db_path() -> String {
    if let Ok(path) = std::env::var("ITEM_IMPORT_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./item_import.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("item-import");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("item_import.db");
        }
    }

    path.to_string_lossy().to_string()
}

/// 初始化 schema（幂等）
///
/// 参考表的 name 列带 COLLATE NOCASE UNIQUE 约束，
/// 使"按规范化名称唯一"由存储层保证，而不是靠先查后插。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )?;

    for kind in AttributeKind::ALL {
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                {column} TEXT NOT NULL COLLATE NOCASE UNIQUE,
                created_at TEXT NOT NULL
            );
            "#,
            table = kind.reference_table(),
            column = kind.reference_column(),
        ))?;
    }

    let attribute_columns: String = AttributeKind::ALL
        .iter()
        .map(|kind| {
            format!(
                "{column} INTEGER REFERENCES {table}(id),\n",
                column = kind.item_column(),
                table = kind.reference_table()
            )
        })
        .collect();

    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            item_id TEXT PRIMARY KEY,
            sku TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            quantity INTEGER NOT NULL CHECK (quantity >= 0),
            price REAL NOT NULL CHECK (price >= 0),
            cost REAL NOT NULL CHECK (cost >= 0),
            tax REAL NOT NULL CHECK (tax >= 0),
            {attribute_columns}
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS duplicate_entries (
            entry_id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL,
            sku TEXT NOT NULL,
            existing_snapshot_json TEXT NOT NULL,
            incoming_snapshot_json TEXT NOT NULL,
            difference_note TEXT NOT NULL,
            resolution TEXT,
            resolved_at TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_duplicate_entries_resolution
            ON duplicate_entries(resolution);
        CREATE INDEX IF NOT EXISTS idx_duplicate_entries_run
            ON duplicate_entries(run_id);
        "#,
        attribute_columns = attribute_columns,
    ))?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
