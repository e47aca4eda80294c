// ==========================================
// 商品批量导入系统 - 商品领域模型
// ==========================================
// 职责: 原始行 / 校验后记录 / 商品快照 / 待插入商品
// 红线: 参考属性统一以规范化名称（TRIM + UPPER）比较与存储
// ==========================================

use crate::domain::types::AttributeKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 原始行：表头 → 未定型的单元格值
pub type RawRow = HashMap<String, serde_json::Value>;

/// SKU 最大长度
pub const SKU_MAX_LEN: usize = 50;

/// 参考属性值规范化（TRIM + UPPER）
///
/// 空白值返回 None
pub fn normalize_attribute_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

// ==========================================
// AttributeValues - 9 维参考属性取值
// ==========================================
// 只保存非空值；缺失的可选属性不出现在 map 中
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeValues(BTreeMap<AttributeKind, String>);

impl AttributeValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: AttributeKind) -> Option<&str> {
        self.0.get(&kind).map(String::as_str)
    }

    /// 写入属性值（空白值视为缺失）
    pub fn set(&mut self, kind: AttributeKind, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.0.remove(&kind);
        } else {
            self.0.insert(kind, trimmed.to_string());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttributeKind, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 返回全部取值规范化后的副本
    pub fn normalized(&self) -> AttributeValues {
        AttributeValues(
            self.0
                .iter()
                .filter_map(|(k, v)| normalize_attribute_value(v).map(|n| (*k, n)))
                .collect(),
        )
    }
}

impl FromIterator<(AttributeKind, String)> for AttributeValues {
    fn from_iter<T: IntoIterator<Item = (AttributeKind, String)>>(iter: T) -> Self {
        let mut values = AttributeValues::new();
        for (kind, value) in iter {
            values.set(kind, &value);
        }
        values
    }
}

// ==========================================
// SourceRow - 带来源行号的原始行
// ==========================================
// 文件导入: 文件中的物理行号（表头为第 1 行，空行也计数）
// 行数组导入: 数组序号（从 1 开始）
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub line: usize,
    pub values: RawRow,
}

impl SourceRow {
    pub fn new(line: usize, values: RawRow) -> Self {
        Self { line, values }
    }

    /// 行数组按顺序编号
    pub fn numbered(rows: Vec<RawRow>) -> Vec<SourceRow> {
        rows.into_iter()
            .enumerate()
            .map(|(idx, values)| SourceRow::new(idx + 1, values))
            .collect()
    }
}

// ==========================================
// ValidatedItemRecord - 校验通过的导入行
// ==========================================
// 只有整批全部校验通过时才会生成
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedItemRecord {
    pub row_number: usize,          // 来源行号（见 SourceRow）
    pub sku: String,                // 商品编码（非空，≤50 字符）
    pub name: String,               // 商品名称
    pub quantity: i64,              // 数量（≥0）
    pub price: f64,                 // 售价（≥0）
    pub cost: f64,                  // 成本（≥0）
    pub tax: f64,                   // 税率/税额（≥0）
    pub attributes: AttributeValues, // 9 维参考属性（原值，未规范化）
}

// ==========================================
// ItemSnapshot - 商品快照
// ==========================================
// 用途: 重复队列中的 existing / incoming 快照（JSON 落库）
// 属性保存规范化名称，而不是参考表 id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
    pub cost: f64,
    pub tax: f64,
    pub attributes: AttributeValues,
}

impl ItemSnapshot {
    /// 由导入行生成快照（属性规范化）
    pub fn from_record(record: &ValidatedItemRecord) -> Self {
        Self {
            sku: record.sku.clone(),
            name: record.name.clone(),
            quantity: record.quantity,
            price: record.price,
            cost: record.cost,
            tax: record.tax,
            attributes: record.attributes.normalized(),
        }
    }

    /// 逐字段比较，返回差异描述（existing → incoming）
    pub fn diff(&self, incoming: &ItemSnapshot) -> Vec<String> {
        let mut changes = Vec::new();

        if self.name != incoming.name {
            changes.push(format!("name: {} → {}", self.name, incoming.name));
        }
        if self.quantity != incoming.quantity {
            changes.push(format!("quantity: {} → {}", self.quantity, incoming.quantity));
        }
        if self.price != incoming.price {
            changes.push(format!("price: {} → {}", self.price, incoming.price));
        }
        if self.cost != incoming.cost {
            changes.push(format!("cost: {} → {}", self.cost, incoming.cost));
        }
        if self.tax != incoming.tax {
            changes.push(format!("tax: {} → {}", self.tax, incoming.tax));
        }

        for kind in AttributeKind::ALL {
            let before = self.attributes.get(kind);
            let after = incoming.attributes.get(kind);
            if before != after {
                changes.push(format!(
                    "{}: {} → {}",
                    kind.as_str(),
                    before.unwrap_or("-"),
                    after.unwrap_or("-")
                ));
            }
        }

        changes
    }
}

// ==========================================
// NewItem - 待插入 / 待覆盖的商品
// ==========================================
// 属性已解析为参考表 id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub item_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
    pub cost: f64,
    pub tax: f64,
    pub attribute_ids: BTreeMap<AttributeKind, i64>,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// StoredItem - 已落库商品
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    pub item_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
    pub cost: f64,
    pub tax: f64,
    pub attribute_ids: BTreeMap<AttributeKind, i64>,
    pub attributes: AttributeValues, // 关联参考表得到的规范化名称
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredItem {
    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            sku: self.sku.clone(),
            name: self.name.clone(),
            quantity: self.quantity,
            price: self.price,
            cost: self.cost,
            tax: self.tax,
            attributes: self.attributes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(quantity: i64, color: Option<&str>) -> ItemSnapshot {
        let mut attributes = AttributeValues::new();
        attributes.set(AttributeKind::Supplier, "ACME");
        if let Some(c) = color {
            attributes.set(AttributeKind::Color, c);
        }
        ItemSnapshot {
            sku: "A".to_string(),
            name: "Shirt".to_string(),
            quantity,
            price: 10.0,
            cost: 4.0,
            tax: 0.0,
            attributes,
        }
    }

    #[test]
    fn test_normalize_attribute_value() {
        assert_eq!(normalize_attribute_value(" red "), Some("RED".to_string()));
        assert_eq!(normalize_attribute_value("RED"), Some("RED".to_string()));
        assert_eq!(normalize_attribute_value("   "), None);
    }

    #[test]
    fn test_attribute_values_blank_is_missing() {
        let mut values = AttributeValues::new();
        values.set(AttributeKind::Color, "  ");
        assert!(values.is_empty());

        values.set(AttributeKind::Color, " teal ");
        assert_eq!(values.get(AttributeKind::Color), Some("teal"));
        assert_eq!(values.normalized().get(AttributeKind::Color), Some("TEAL"));
    }

    #[test]
    fn test_snapshot_diff() {
        let existing = snapshot(5, Some("RED"));
        let incoming = snapshot(12, Some("TEAL"));

        let diff = existing.diff(&incoming);
        assert_eq!(diff.len(), 2);
        assert_eq!(diff[0], "quantity: 5 → 12");
        assert_eq!(diff[1], "color: RED → TEAL");

        assert!(existing.diff(&existing.clone()).is_empty());
    }

    #[test]
    fn test_snapshot_json_keys() {
        let json = serde_json::to_value(snapshot(1, Some("RED"))).unwrap();
        assert_eq!(json["attributes"]["color"], "RED");
        assert_eq!(json["attributes"]["supplier"], "ACME");
    }
}
