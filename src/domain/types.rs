// ==========================================
// 商品批量导入系统 - 领域类型定义
// ==========================================
// 职责: 导入模式 / 参考属性种类 / 重复处理结论 / 数量更新策略
// 序列化: serde snake_case（与前端约定一致）；落库使用 as_str()
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 导入模式 (Import Mode)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    Full,         // 新增插入，已存在进入重复队列
    QuantityOnly, // 仅覆盖已存在商品的数量，新商品忽略
    NewOnly,      // 仅插入新商品，已存在直接拒绝
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Full => "FULL",
            ImportMode::QuantityOnly => "QUANTITY_ONLY",
            ImportMode::NewOnly => "NEW_ONLY",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "FULL" => Ok(ImportMode::Full),
            "QUANTITY_ONLY" => Ok(ImportMode::QuantityOnly),
            "NEW_ONLY" => Ok(ImportMode::NewOnly),
            other => Err(format!("未知导入模式: {}", other)),
        }
    }
}

// ==========================================
// 参考属性种类 (Attribute Kind)
// ==========================================
// 9 个分类维度，每个维度对应一张参考表
// 表名/列名均为编译期常量，可安全拼接进 SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Supplier,
    Gender,
    MainGroup,
    Category,
    Origin,
    Season,
    Size,
    Color,
    Theme,
}

impl AttributeKind {
    /// 全部属性种类（固定顺序，决定预检与落库顺序）
    pub const ALL: [AttributeKind; 9] = [
        AttributeKind::Supplier,
        AttributeKind::Gender,
        AttributeKind::MainGroup,
        AttributeKind::Category,
        AttributeKind::Origin,
        AttributeKind::Season,
        AttributeKind::Size,
        AttributeKind::Color,
        AttributeKind::Theme,
    ];

    /// 导入文件中的标准表头
    pub fn file_header(&self) -> &'static str {
        match self {
            AttributeKind::Supplier => "Supplier",
            AttributeKind::Gender => "Gender",
            AttributeKind::MainGroup => "Main Group",
            AttributeKind::Category => "Category",
            AttributeKind::Origin => "Origin",
            AttributeKind::Season => "Season",
            AttributeKind::Size => "Size",
            AttributeKind::Color => "Color",
            AttributeKind::Theme => "Theme",
        }
    }

    /// 参考表名
    pub fn reference_table(&self) -> &'static str {
        match self {
            AttributeKind::Supplier => "suppliers",
            AttributeKind::Gender => "genders",
            AttributeKind::MainGroup => "main_groups",
            AttributeKind::Category => "categories",
            AttributeKind::Origin => "origins",
            AttributeKind::Season => "seasons",
            AttributeKind::Size => "sizes",
            AttributeKind::Color => "colors",
            AttributeKind::Theme => "themes",
        }
    }

    /// 参考表中保存规范化名称的列
    pub fn reference_column(&self) -> &'static str {
        "name"
    }

    /// items 表中的外键列
    pub fn item_column(&self) -> &'static str {
        match self {
            AttributeKind::Supplier => "supplier_id",
            AttributeKind::Gender => "gender_id",
            AttributeKind::MainGroup => "main_group_id",
            AttributeKind::Category => "category_id",
            AttributeKind::Origin => "origin_id",
            AttributeKind::Season => "season_id",
            AttributeKind::Size => "size_id",
            AttributeKind::Color => "color_id",
            AttributeKind::Theme => "theme_id",
        }
    }

    /// 是否必填（供应商/分类/大类）
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            AttributeKind::Supplier | AttributeKind::Category | AttributeKind::MainGroup
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKind::Supplier => "supplier",
            AttributeKind::Gender => "gender",
            AttributeKind::MainGroup => "main_group",
            AttributeKind::Category => "category",
            AttributeKind::Origin => "origin",
            AttributeKind::Season => "season",
            AttributeKind::Size => "size",
            AttributeKind::Color => "color",
            AttributeKind::Theme => "theme",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_header())
    }
}

// ==========================================
// 重复处理结论 (Duplicate Resolution)
// ==========================================
// 单向终态：一旦写入不可回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateResolution {
    KeepExisting,  // 保留现有数据
    UpdateWithNew, // 用导入数据覆盖
    Ignore,        // 忽略（不比较、不修改）
}

impl DuplicateResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateResolution::KeepExisting => "keep_existing",
            DuplicateResolution::UpdateWithNew => "update_with_new",
            DuplicateResolution::Ignore => "ignore",
        }
    }
}

impl fmt::Display for DuplicateResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DuplicateResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep_existing" => Ok(DuplicateResolution::KeepExisting),
            "update_with_new" => Ok(DuplicateResolution::UpdateWithNew),
            "ignore" => Ok(DuplicateResolution::Ignore),
            other => Err(format!(
                "无效的处理结论: {}，应为 keep_existing/update_with_new/ignore",
                other
            )),
        }
    }
}

// ==========================================
// 数量更新策略 (Quantity Update Strategy)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuantityUpdateStrategy {
    Batch,  // 单事务批量更新，整体成功或整体失败
    PerRow, // 逐行并发更新，各行独立计数
}

impl QuantityUpdateStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuantityUpdateStrategy::Batch => "BATCH",
            QuantityUpdateStrategy::PerRow => "PER_ROW",
        }
    }
}

impl FromStr for QuantityUpdateStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BATCH" => Ok(QuantityUpdateStrategy::Batch),
            "PER_ROW" => Ok(QuantityUpdateStrategy::PerRow),
            other => Err(format!("未知数量更新策略: {}", other)),
        }
    }
}
