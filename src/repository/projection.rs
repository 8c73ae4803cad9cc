// ==========================================
// 通用实体仓储 - 列投影解析
// ==========================================
// 职责: 将列选择规格解析为有序输出列
// 规则: true → 字段本身; 非空字符串 → 重命名为该字符串;
//       false / 空字符串 / 未出现 → 排除; 结果为空 → 全部列
// ==========================================

use serde_json::Value;

use crate::repository::statement::quote_ident;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelector {
    Flag(bool),
    Rename(String),
}

/// 列选择规格 (保持声明顺序)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSelection {
    entries: Vec<(String, ColumnSelector)>,
}

impl ColumnSelection {
    /// 空规格, 解析为全部列
    pub fn all() -> Self {
        Self::default()
    }

    pub fn include(mut self, field: impl Into<String>) -> Self {
        self.entries.push((field.into(), ColumnSelector::Flag(true)));
        self
    }

    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.entries.push((field.into(), ColumnSelector::Flag(false)));
        self
    }

    pub fn rename(mut self, field: impl Into<String>, alias: impl Into<String>) -> Self {
        self.entries
            .push((field.into(), ColumnSelector::Rename(alias.into())));
        self
    }

    pub fn resolve(&self) -> Projection {
        let columns: Vec<SelectedColumn> = self
            .entries
            .iter()
            .filter_map(|(field, selector)| match selector {
                ColumnSelector::Flag(true) => Some(SelectedColumn {
                    source: field.clone(),
                    output: field.clone(),
                }),
                ColumnSelector::Rename(alias) if !alias.is_empty() => Some(SelectedColumn {
                    source: field.clone(),
                    output: alias.clone(),
                }),
                _ => None,
            })
            .collect();

        if columns.is_empty() {
            Projection::All
        } else {
            Projection::Columns(columns)
        }
    }
}

/// 由 JSON 对象构造, 例如 `{"id": true, "name": "displayName"}`
impl TryFrom<Value> for ColumnSelection {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let map = match value {
            Value::Object(map) => map,
            other => return Err(format!("列选择规格必须为对象, 实际为: {}", other)),
        };

        let mut entries = Vec::with_capacity(map.len());
        for (field, selector) in map {
            let selector = match selector {
                Value::Bool(flag) => ColumnSelector::Flag(flag),
                Value::String(alias) => ColumnSelector::Rename(alias),
                other => {
                    return Err(format!(
                        "字段 {} 的选择值必须为布尔或字符串, 实际为: {}",
                        field, other
                    ))
                }
            };
            entries.push((field, selector));
        }
        Ok(Self { entries })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedColumn {
    pub source: String,
    pub output: String,
}

/// 解析后的投影
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    All,
    Columns(Vec<SelectedColumn>),
}

impl Projection {
    /// 输出列名, 通配时为 `["*"]`
    pub fn output_names(&self) -> Vec<String> {
        match self {
            Projection::All => vec!["*".to_string()],
            Projection::Columns(columns) => columns.iter().map(|c| c.output.clone()).collect(),
        }
    }

    /// SELECT / RETURNING 列表
    pub fn to_sql(&self) -> String {
        match self {
            Projection::All => "*".to_string(),
            Projection::Columns(columns) => columns
                .iter()
                .map(|c| {
                    if c.source == c.output {
                        quote_ident(&c.source)
                    } else {
                        format!("{} AS {}", quote_ident(&c.source), quote_ident(&c.output))
                    }
                })
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}
