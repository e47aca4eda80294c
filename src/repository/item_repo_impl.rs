// ==========================================
// 商品批量导入系统 - 商品 Repository 实现
// ==========================================
// 职责: 实现商品数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::item::{AttributeValues, ItemSnapshot, NewItem, StoredItem};
use crate::domain::types::AttributeKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::item_repo::ItemRepository;
use crate::repository::parse_rfc3339;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// items 基础列数（属性列之前）
const BASE_COLUMNS: usize = 9;

/// 拼接带 9 张参考表 LEFT JOIN 的查询语句
///
/// 列顺序: item_id, sku, name, quantity, price, cost, tax, created_at, updated_at,
/// 随后每个属性依次为 (外键 id, 参考名称)
fn item_select_sql() -> String {
    let mut columns = String::from(
        "i.item_id, i.sku, i.name, i.quantity, i.price, i.cost, i.tax, i.created_at, i.updated_at",
    );
    let mut joins = String::new();

    for (idx, kind) in AttributeKind::ALL.iter().enumerate() {
        columns.push_str(&format!(
            ", i.{col}, a{idx}.{name}",
            col = kind.item_column(),
            idx = idx,
            name = kind.reference_column()
        ));
        joins.push_str(&format!(
            " LEFT JOIN {table} a{idx} ON a{idx}.id = i.{col}",
            table = kind.reference_table(),
            idx = idx,
            col = kind.item_column()
        ));
    }

    format!("SELECT {} FROM items i{}", columns, joins)
}

fn map_stored_item(row: &Row<'_>) -> rusqlite::Result<StoredItem> {
    let mut attribute_ids = BTreeMap::new();
    let mut attributes = AttributeValues::new();

    for (idx, kind) in AttributeKind::ALL.iter().enumerate() {
        let id: Option<i64> = row.get(BASE_COLUMNS + idx * 2)?;
        let name: Option<String> = row.get(BASE_COLUMNS + idx * 2 + 1)?;
        if let Some(id) = id {
            attribute_ids.insert(*kind, id);
        }
        if let Some(name) = name {
            attributes.set(*kind, &name);
        }
    }

    Ok(StoredItem {
        item_id: row.get(0)?,
        sku: row.get(1)?,
        name: row.get(2)?,
        quantity: row.get(3)?,
        price: row.get(4)?,
        cost: row.get(5)?,
        tax: row.get(6)?,
        attribute_ids,
        attributes,
        created_at: parse_rfc3339(&row.get::<_, String>(7)?),
        updated_at: parse_rfc3339(&row.get::<_, String>(8)?),
    })
}

/// 属性外键参数（按 AttributeKind::ALL 顺序，缺失为 NULL）
fn attribute_id_values(item: &NewItem) -> Vec<Value> {
    AttributeKind::ALL
        .iter()
        .map(|kind| match item.attribute_ids.get(kind) {
            Some(id) => Value::Integer(*id),
            None => Value::Null,
        })
        .collect()
}

// ==========================================
// ItemRepositoryImpl
// ==========================================
pub struct ItemRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ItemRepositoryImpl {
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

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn insert_sql() -> String {
        let attribute_columns: Vec<&str> =
            AttributeKind::ALL.iter().map(|k| k.item_column()).collect();
        let placeholders: Vec<String> = (1..=BASE_COLUMNS + AttributeKind::ALL.len())
            .map(|i| format!("?{}", i))
            .collect();

        format!(
            "INSERT INTO items (item_id, sku, name, quantity, price, cost, tax, created_at, updated_at, {}) VALUES ({})",
            attribute_columns.join(", "),
            placeholders.join(", ")
        )
    }

    fn overwrite_sql() -> String {
        let assignments: Vec<String> = AttributeKind::ALL
            .iter()
            .enumerate()
            .map(|(idx, kind)| format!("{} = ?{}", kind.item_column(), idx + 8))
            .collect();

        format!(
            "UPDATE items SET name = ?2, quantity = ?3, price = ?4, cost = ?5, tax = ?6, updated_at = ?7, {} WHERE sku = ?1",
            assignments.join(", ")
        )
    }
}

#[async_trait]
impl ItemRepository for ItemRepositoryImpl {
    async fn find_snapshots_by_skus(
        &self,
        skus: &[String],
    ) -> RepositoryResult<HashMap<String, ItemSnapshot>> {
        if skus.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.get_conn()?;

        // 单参数 JSON 数组，避免 SQLite 变量个数上限
        let sku_json = serde_json::to_string(skus)?;
        let sql = format!(
            "{} WHERE i.sku IN (SELECT value FROM json_each(?1))",
            item_select_sql()
        );

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![sku_json], map_stored_item)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items
            .into_iter()
            .map(|item| (item.sku.clone(), item.snapshot()))
            .collect())
    }

    async fn find_by_sku(&self, sku: &str) -> RepositoryResult<Option<StoredItem>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE i.sku = ?1", item_select_sql());

        let item = conn
            .query_row(&sql, params![sku], map_stored_item)
            .optional()?;

        Ok(item)
    }

    async fn count_items(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn batch_insert_items(&self, items: Vec<NewItem>) -> RepositoryResult<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let sql = Self::insert_sql();
        let mut stmt = tx.prepare(&sql)?;

        let mut count = 0;
        for item in &items {
            let created_at = item.created_at.to_rfc3339();
            let mut values = vec![
                Value::Text(item.item_id.clone()),
                Value::Text(item.sku.clone()),
                Value::Text(item.name.clone()),
                Value::Integer(item.quantity),
                Value::Real(item.price),
                Value::Real(item.cost),
                Value::Real(item.tax),
                Value::Text(created_at.clone()),
                Value::Text(created_at),
            ];
            values.extend(attribute_id_values(item));

            stmt.execute(params_from_iter(values.iter()))?;
            count += 1;
        }

        // 显式释放 stmt 的借用,以便提交事务
        drop(stmt);

        tx.commit()?;
        Ok(count)
    }

    async fn update_quantity(&self, sku: &str, quantity: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "UPDATE items SET quantity = ?1, updated_at = ?2 WHERE sku = ?3",
            params![quantity, Utc::now().to_rfc3339(), sku],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Item".to_string(),
                id: sku.to_string(),
            });
        }

        Ok(())
    }

    async fn batch_update_quantities(
        &self,
        updates: Vec<(String, i64)>,
    ) -> RepositoryResult<usize> {
        if updates.is_empty() {
            return Ok(0);
        }

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();

        let mut stmt =
            tx.prepare("UPDATE items SET quantity = ?1, updated_at = ?2 WHERE sku = ?3")?;

        let mut count = 0;
        for (sku, quantity) in &updates {
            let affected = stmt.execute(params![quantity, now, sku])?;
            if affected == 0 {
                return Err(RepositoryError::NotFound {
                    entity: "Item".to_string(),
                    id: sku.clone(),
                });
            }
            count += 1;
        }

        drop(stmt);

        tx.commit()?;
        Ok(count)
    }
}

/// 用新数据逐字段覆盖已存在商品（item_id / created_at 保持不变）
///
/// 在调用方持有的连接/事务上执行
///
/// # 返回
/// - Err(NotFound): SKU 不存在
pub(crate) fn overwrite_item(conn: &Connection, item: &NewItem) -> RepositoryResult<()> {
    let mut values = vec![
        Value::Text(item.sku.clone()),
        Value::Text(item.name.clone()),
        Value::Integer(item.quantity),
        Value::Real(item.price),
        Value::Real(item.cost),
        Value::Real(item.tax),
        Value::Text(Utc::now().to_rfc3339()),
    ];
    values.extend(attribute_id_values(item));

    let affected = conn.execute(
        &ItemRepositoryImpl::overwrite_sql(),
        params_from_iter(values.iter()),
    )?;

    if affected == 0 {
        return Err(RepositoryError::NotFound {
            entity: "Item".to_string(),
            id: item.sku.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_sql_placeholder_count() {
        let sql = ItemRepositoryImpl::insert_sql();
        assert!(sql.contains("?18"));
        assert!(!sql.contains("?19"));
        assert!(sql.contains("theme_id"));
    }

    #[test]
    fn test_overwrite_sql_binds_all_attributes() {
        let sql = ItemRepositoryImpl::overwrite_sql();
        assert!(sql.contains("supplier_id = ?8"));
        assert!(sql.contains("theme_id = ?16"));
        assert!(sql.ends_with("WHERE sku = ?1"));
    }

    #[test]
    fn test_select_sql_joins_every_reference_table() {
        let sql = item_select_sql();
        for kind in AttributeKind::ALL {
            assert!(sql.contains(&format!("LEFT JOIN {} ", kind.reference_table())));
        }
    }
}
