// ==========================================
// 商品批量导入系统 - 行校验器实现
// ==========================================
// 职责: 表头映射 + 类型转换 + 约束校验（整批全有或全无）
// 红线: 任一行不合法 → 整批拒绝，不进入属性预检
// ==========================================

use crate::domain::item::{AttributeValues, RawRow, SourceRow, ValidatedItemRecord, SKU_MAX_LEN};
use crate::domain::types::AttributeKind;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::item_importer_trait::RowValidator;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// 标准字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ItemField {
    Sku,
    Name,
    Quantity,
    Price,
    Cost,
    Tax,
    Attribute(AttributeKind),
}

impl ItemField {
    fn label(&self) -> &'static str {
        match self {
            ItemField::Sku => "SKU",
            ItemField::Name => "Name",
            ItemField::Quantity => "Quantity",
            ItemField::Price => "Price",
            ItemField::Cost => "Cost",
            ItemField::Tax => "Tax",
            ItemField::Attribute(kind) => kind.file_header(),
        }
    }
}

/// 表头规范化: 小写并去除空格 / 下划线 / 连字符
fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// 规范化表头 → 标准字段（含别名）
fn resolve_header(header: &str) -> Option<ItemField> {
    let field = match normalize_header(header).as_str() {
        "sku" | "itemcode" | "code" => ItemField::Sku,
        "name" | "itemname" | "productname" => ItemField::Name,
        "quantity" | "qty" | "stock" => ItemField::Quantity,
        "price" | "saleprice" | "retailprice" => ItemField::Price,
        "cost" | "costprice" => ItemField::Cost,
        "tax" | "taxrate" => ItemField::Tax,
        "supplier" | "vendor" => ItemField::Attribute(AttributeKind::Supplier),
        "gender" => ItemField::Attribute(AttributeKind::Gender),
        "maingroup" => ItemField::Attribute(AttributeKind::MainGroup),
        "category" => ItemField::Attribute(AttributeKind::Category),
        "origin" | "countryoforigin" => ItemField::Attribute(AttributeKind::Origin),
        "season" => ItemField::Attribute(AttributeKind::Season),
        "size" => ItemField::Attribute(AttributeKind::Size),
        "color" | "colour" => ItemField::Attribute(AttributeKind::Color),
        "theme" => ItemField::Attribute(AttributeKind::Theme),
        _ => return None,
    };
    Some(field)
}

/// 单元格 → 文本（空值为 None）
fn value_as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            // 表格中的整数编码常以浮点形式出现（1001.0）
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// 单元格 → 数值（空值为 None）
fn value_as_number(value: &Value) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("无法解析为数值: {}", n)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map(Some)
                .map_err(|_| format!("无法解析为数值: {}", trimmed))
        }
        other => Err(format!("无法解析为数值: {}", other)),
    }
}

// ==========================================
// ItemRowValidator
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ItemRowValidator;

impl ItemRowValidator {
    pub fn new() -> Self {
        Self
    }

    /// 按标准字段重新索引一行（同一字段出现多列时取第一个非空值）
    fn index_row(row: &RawRow) -> HashMap<ItemField, &Value> {
        let mut indexed: HashMap<ItemField, &Value> = HashMap::new();
        for (header, value) in row {
            let Some(field) = resolve_header(header) else {
                continue;
            };
            let replace = match indexed.get(&field) {
                None => true,
                Some(existing) => value_as_text(existing).is_none(),
            };
            if replace {
                indexed.insert(field, value);
            }
        }
        indexed
    }

    fn text(indexed: &HashMap<ItemField, &Value>, field: ItemField) -> Option<String> {
        indexed.get(&field).and_then(|v| value_as_text(v))
    }

    /// 非负数值；缺失按 0 处理
    fn non_negative(
        indexed: &HashMap<ItemField, &Value>,
        field: ItemField,
        errors: &mut Vec<String>,
    ) -> f64 {
        let parsed = match indexed.get(&field) {
            None => Ok(None),
            Some(value) => value_as_number(value),
        };

        match parsed {
            Ok(None) => 0.0,
            Ok(Some(n)) if !n.is_finite() => {
                errors.push(format!("{} 不是有效数值", field.label()));
                0.0
            }
            Ok(Some(n)) if n < 0.0 => {
                errors.push(format!("{} 不能为负数: {}", field.label(), n));
                0.0
            }
            Ok(Some(n)) => n,
            Err(message) => {
                errors.push(format!("{} {}", field.label(), message));
                0.0
            }
        }
    }

    /// 校验单行，返回记录或该行的全部错误
    fn validate_row(row: &RawRow, row_number: usize) -> Result<ValidatedItemRecord, Vec<String>> {
        let indexed = Self::index_row(row);
        let mut errors = Vec::new();

        let sku = Self::text(&indexed, ItemField::Sku).unwrap_or_default();
        if sku.is_empty() {
            errors.push("SKU 不能为空".to_string());
        } else if sku.chars().count() > SKU_MAX_LEN {
            errors.push(format!("SKU 长度超过 {} 个字符", SKU_MAX_LEN));
        }

        let name = Self::text(&indexed, ItemField::Name).unwrap_or_default();
        if name.is_empty() {
            errors.push("Name 不能为空".to_string());
        }

        let quantity = Self::non_negative(&indexed, ItemField::Quantity, &mut errors);
        if quantity.fract() != 0.0 {
            errors.push(format!("Quantity 必须为整数: {}", quantity));
        } else if quantity > i64::MAX as f64 {
            errors.push(format!("Quantity 超出范围: {}", quantity));
        }
        let price = Self::non_negative(&indexed, ItemField::Price, &mut errors);
        let cost = Self::non_negative(&indexed, ItemField::Cost, &mut errors);
        let tax = Self::non_negative(&indexed, ItemField::Tax, &mut errors);

        let mut attributes = AttributeValues::new();
        for kind in AttributeKind::ALL {
            match Self::text(&indexed, ItemField::Attribute(kind)) {
                Some(value) => attributes.set(kind, &value),
                None if kind.is_required() => {
                    errors.push(format!("{} 不能为空", kind.file_header()));
                }
                None => {}
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidatedItemRecord {
            row_number,
            sku,
            name,
            quantity: quantity as i64,
            price,
            cost,
            tax,
            attributes,
        })
    }
}

impl RowValidator for ItemRowValidator {
    fn validate(&self, rows: &[SourceRow]) -> ImportResult<Vec<ValidatedItemRecord>> {
        if rows.is_empty() {
            return Err(ImportError::ValidationFailed {
                errors: vec!["导入数据为空".to_string()],
            });
        }

        let mut records = Vec::with_capacity(rows.len());
        let mut errors = Vec::new();
        let mut first_seen: HashMap<String, usize> = HashMap::new();

        for row in rows {
            let row_number = row.line;
            match Self::validate_row(&row.values, row_number) {
                Ok(record) => {
                    if let Some(first) = first_seen.get(&record.sku) {
                        errors.push(format!(
                            "行 {}: SKU {} 与行 {} 重复",
                            row_number, record.sku, first
                        ));
                        continue;
                    }
                    first_seen.insert(record.sku.clone(), row_number);
                    records.push(record);
                }
                Err(row_errors) => {
                    errors.extend(
                        row_errors
                            .into_iter()
                            .map(|e| format!("行 {}: {}", row_number, e)),
                    );
                }
            }
        }

        if !errors.is_empty() {
            warn!(
                total = rows.len(),
                error_count = errors.len(),
                "行校验失败，整批拒绝"
            );
            return Err(ImportError::ValidationFailed { errors });
        }

        debug!(total = records.len(), "行校验通过");
        Ok(records)
    }
}
