// ==========================================
// 通用实体仓储 - 查询条件编译器
// ==========================================
// 职责: 将检索规格 (有序 Clause 列表) 编译为一棵布尔条件树,
//       再渲染为参数化的 WHERE 片段
// 约束: 标识符一律加引号, 值一律走参数绑定
// ==========================================

use serde::Serialize;
use serde_json::Value;

use crate::repository::statement::quote_ident;

// ==========================================
// Operators - 单字段运算符集合
// ==========================================
/// 复杂子句中一个字段的运算符集合
///
/// 运算符按固定顺序展开: in, not_in, eq, not_eq, like, lt, lte, gt, gte。
/// 操作数为空 (`null` / 空字符串 / 空列表) 的运算符直接跳过。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Operators {
    is_in: Option<Vec<Value>>,
    not_in: Option<Vec<Value>>,
    eq: Option<Value>,
    not_eq: Option<Value>,
    like: Option<String>,
    lt: Option<Value>,
    lte: Option<Value>,
    gt: Option<Value>,
    gte: Option<Value>,
}

impl Operators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.is_in = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn not_in<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.not_in = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn eq(mut self, value: impl Into<Value>) -> Self {
        self.eq = Some(value.into());
        self
    }

    pub fn not_eq(mut self, value: impl Into<Value>) -> Self {
        self.not_eq = Some(value.into());
        self
    }

    /// SQL LIKE 模式，通配符由调用方给出 (例如 `"%@x.com"`)
    pub fn like(mut self, pattern: impl Into<String>) -> Self {
        self.like = Some(pattern.into());
        self
    }

    pub fn lt(mut self, value: impl Into<Value>) -> Self {
        self.lt = Some(value.into());
        self
    }

    pub fn lte(mut self, value: impl Into<Value>) -> Self {
        self.lte = Some(value.into());
        self
    }

    pub fn gt(mut self, value: impl Into<Value>) -> Self {
        self.gt = Some(value.into());
        self
    }

    pub fn gte(mut self, value: impl Into<Value>) -> Self {
        self.gte = Some(value.into());
        self
    }

    /// 按固定顺序展开为谓词, 跳过空操作数
    fn predicates(&self, column: &str) -> Vec<Condition> {
        let mut out = Vec::new();

        if let Some(values) = self.is_in.as_ref().filter(|v| !v.is_empty()) {
            out.push(Predicate::In {
                column: column.to_string(),
                values: values.clone(),
            });
        }
        if let Some(values) = self.not_in.as_ref().filter(|v| !v.is_empty()) {
            out.push(Predicate::NotIn {
                column: column.to_string(),
                values: values.clone(),
            });
        }
        if let Some(value) = present(&self.eq) {
            out.push(Predicate::Eq {
                column: column.to_string(),
                value: value.clone(),
            });
        }
        if let Some(value) = present(&self.not_eq) {
            out.push(Predicate::NotEq {
                column: column.to_string(),
                value: value.clone(),
            });
        }
        if let Some(pattern) = self.like.as_ref().filter(|p| !p.is_empty()) {
            out.push(Predicate::Like {
                column: column.to_string(),
                pattern: pattern.clone(),
            });
        }

        let ordered = [
            (Comparison::Lt, &self.lt),
            (Comparison::Lte, &self.lte),
            (Comparison::Gt, &self.gt),
            (Comparison::Gte, &self.gte),
        ];
        for (op, operand) in ordered {
            if let Some(value) = present(operand) {
                out.push(Predicate::Compare {
                    column: column.to_string(),
                    op,
                    value: value.clone(),
                });
            }
        }

        out.into_iter().map(Condition::Predicate).collect()
    }
}

fn present(operand: &Option<Value>) -> Option<&Value> {
    operand.as_ref().filter(|v| !is_blank(v))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

// ==========================================
// Clause - 检索规格中的一个子句
// ==========================================
/// 子句类型由调用方显式选择，不在运行时按值形状猜测
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// 字段等值, 字段之间 AND
    Simple(Vec<(String, Value)>),
    /// 字段运算符集合, 整个子句内所有运算符 AND
    Complex(Vec<(String, Operators)>),
}

impl Clause {
    pub fn simple<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Clause::Simple(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn complex<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Operators)>,
        K: Into<String>,
    {
        Clause::Complex(fields.into_iter().map(|(k, ops)| (k.into(), ops)).collect())
    }

    /// 由部分实体构造等值子句
    ///
    /// `null` 字段视为未提供 (对应 `Option::None`)，不参与匹配。
    pub fn from_partial<P: Serialize>(partial: &P) -> Result<Self, serde_json::Error> {
        match serde_json::to_value(partial)? {
            Value::Object(map) => Ok(Clause::Simple(
                map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
            )),
            other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
                "部分实体必须序列化为对象, 实际为: {}",
                other
            ))),
        }
    }

    fn predicates(&self) -> Vec<Condition> {
        match self {
            Clause::Simple(fields) => fields
                .iter()
                .map(|(column, value)| {
                    let predicate = if value.is_null() {
                        Predicate::IsNull {
                            column: column.clone(),
                        }
                    } else {
                        Predicate::Eq {
                            column: column.clone(),
                            value: value.clone(),
                        }
                    };
                    Condition::Predicate(predicate)
                })
                .collect(),
            Clause::Complex(fields) => fields
                .iter()
                .flat_map(|(column, ops)| ops.predicates(column))
                .collect(),
        }
    }
}

// ==========================================
// 条件树
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparison {
    fn as_sql(&self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq { column: String, value: Value },
    IsNull { column: String },
    NotEq { column: String, value: Value },
    In { column: String, values: Vec<Value> },
    NotIn { column: String, values: Vec<Value> },
    Like { column: String, pattern: String },
    Compare { column: String, op: Comparison, value: Value },
}

impl Predicate {
    fn render(&self, params: &mut Vec<Value>) -> String {
        match self {
            Predicate::Eq { column, value } => {
                params.push(value.clone());
                format!("{} = ?", quote_ident(column))
            }
            Predicate::IsNull { column } => format!("{} IS NULL", quote_ident(column)),
            Predicate::NotEq { column, value } => {
                params.push(value.clone());
                format!("{} <> ?", quote_ident(column))
            }
            Predicate::In { column, values } => {
                params.extend(values.iter().cloned());
                format!("{} IN ({})", quote_ident(column), placeholders(values.len()))
            }
            Predicate::NotIn { column, values } => {
                params.extend(values.iter().cloned());
                format!(
                    "{} NOT IN ({})",
                    quote_ident(column),
                    placeholders(values.len())
                )
            }
            Predicate::Like { column, pattern } => {
                params.push(Value::String(pattern.clone()));
                format!("{} LIKE ?", quote_ident(column))
            }
            Predicate::Compare { column, op, value } => {
                params.push(value.clone());
                format!("{} {} ?", quote_ident(column), op.as_sql())
            }
        }
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// 编译后的布尔条件
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Predicate(Predicate),
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    /// 单个谓词不再包一层 All
    fn all(mut parts: Vec<Condition>) -> Condition {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Condition::All(parts)
        }
    }

    /// 渲染为 SQL 片段并按出现顺序追加参数
    ///
    /// OR 分支中的 AND 组总是加括号，避免 AND 优先级把谓词并到相邻分支。
    pub fn to_sql(&self, params: &mut Vec<Value>) -> String {
        match self {
            Condition::Predicate(p) => p.render(params),
            Condition::All(parts) => parts
                .iter()
                .map(|part| match part {
                    Condition::Any(_) => format!("({})", part.to_sql(params)),
                    _ => part.to_sql(params),
                })
                .collect::<Vec<_>>()
                .join(" AND "),
            Condition::Any(parts) => parts
                .iter()
                .map(|part| match part {
                    Condition::All(_) => format!("({})", part.to_sql(params)),
                    _ => part.to_sql(params),
                })
                .collect::<Vec<_>>()
                .join(" OR "),
        }
    }
}

// ==========================================
// 编译
// ==========================================
/// 将有序子句列表编译为完整的 WHERE 条件
///
/// - 第 0 个子句并入基础条件 (基础条件为空, 即成为第一个分支)
/// - 之后每个子句作为新的 OR 分支
/// - 子句内部所有谓词 AND 到该子句打开的分支
/// - 不产生任何谓词的子句为空操作, 直接丢弃
///
/// 返回 `None` 表示不过滤。
pub fn compile(clauses: &[Clause]) -> Option<Condition> {
    let mut branches = Vec::with_capacity(clauses.len());

    for (index, clause) in clauses.iter().enumerate() {
        let predicates = clause.predicates();
        if predicates.is_empty() {
            tracing::trace!(index, "检索子句无有效谓词, 跳过");
            continue;
        }
        branches.push(Condition::all(predicates));
    }

    match branches.len() {
        0 => None,
        1 => branches.pop(),
        _ => Some(Condition::Any(branches)),
    }
}

// ==========================================
// 单元测试
// ==========================================
