// ==========================================
// 通用实体仓储 - SQL 语句构建
// ==========================================
// 职责: 按表名 + 条件树 + 投影组装参数化语句
// 约束: 标识符一律加引号, 值一律走参数绑定, 防止 SQL 注入
// ==========================================

use serde_json::{Map, Value};

use crate::repository::predicate::Condition;
use crate::repository::projection::Projection;

/// 给标识符加双引号, 内部的双引号转义为两个
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// 一条待执行的语句
///
/// `returns_rows` 为 true 时执行器按查询取回结果行,
/// 否则只返回受影响行数。
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
    pub returns_rows: bool,
}

impl SqlStatement {
    pub fn query(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
            returns_rows: true,
        }
    }

    pub fn execute(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
            returns_rows: false,
        }
    }
}

#[derive(Debug, Clone)]
enum StatementKind {
    Select(Projection),
    Count,
    Update(Map<String, Value>),
    Delete,
}

/// SQL 语句构建器（流式 API）
///
/// # 示例
/// ```
/// use model_repository::repository::statement::SqlQueryBuilder;
/// use model_repository::repository::projection::Projection;
///
/// let stmt = SqlQueryBuilder::select("users", &Projection::All)
///     .limit(Some(10))
///     .offset(Some(20))
///     .build();
///
/// assert_eq!(stmt.sql, "SELECT * FROM \"users\" LIMIT 10 OFFSET 20");
/// ```
#[derive(Debug, Clone)]
pub struct SqlQueryBuilder {
    table: String,
    kind: StatementKind,
    condition: Option<Condition>,
    returning: Option<Projection>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SqlQueryBuilder {
    fn new(table: &str, kind: StatementKind) -> Self {
        Self {
            table: table.to_string(),
            kind,
            condition: None,
            returning: None,
            limit: None,
            offset: None,
        }
    }

    pub fn select(table: &str, projection: &Projection) -> Self {
        Self::new(table, StatementKind::Select(projection.clone()))
    }

    /// 计数; 带 LIMIT/OFFSET 时对窗口内的行计数
    pub fn count(table: &str) -> Self {
        Self::new(table, StatementKind::Count)
    }

    pub fn update(table: &str, patch: Map<String, Value>) -> Self {
        Self::new(table, StatementKind::Update(patch))
    }

    pub fn delete(table: &str) -> Self {
        Self::new(table, StatementKind::Delete)
    }

    /// 设置 WHERE 条件 (None 表示不过滤)
    pub fn where_condition(mut self, condition: Option<Condition>) -> Self {
        self.condition = condition;
        self
    }

    /// 添加 RETURNING 子句
    pub fn returning(mut self, projection: &Projection) -> Self {
        self.returning = Some(projection.clone());
        self
    }

    pub fn limit(mut self, n: Option<u64>) -> Self {
        self.limit = n;
        self
    }

    pub fn offset(mut self, n: Option<u64>) -> Self {
        self.offset = n;
        self
    }

    /// 构建最终的 SQL 语句
    pub fn build(&self) -> SqlStatement {
        let table = quote_ident(&self.table);
        let mut params = Vec::new();

        let mut sql = match &self.kind {
            StatementKind::Select(projection) => {
                format!("SELECT {} FROM {}", projection.to_sql(), table)
            }
            StatementKind::Count => format!("SELECT 1 FROM {}", table),
            StatementKind::Update(patch) => {
                let assignments: Vec<String> = patch
                    .iter()
                    .map(|(column, value)| {
                        params.push(value.clone());
                        format!("{} = ?", quote_ident(column))
                    })
                    .collect();
                format!("UPDATE {} SET {}", table, assignments.join(", "))
            }
            StatementKind::Delete => format!("DELETE FROM {}", table),
        };

        // 添加 WHERE 条件
        if let Some(condition) = &self.condition {
            sql.push_str(" WHERE ");
            sql.push_str(&condition.to_sql(&mut params));
        }

        // 添加 LIMIT / OFFSET (SQLite 的 OFFSET 必须跟在 LIMIT 之后)
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset))
            }
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        // 添加 RETURNING
        if let Some(projection) = &self.returning {
            sql.push_str(" RETURNING ");
            sql.push_str(&projection.to_sql());
        }

        match &self.kind {
            StatementKind::Select(_) => SqlStatement::query(sql, params),
            StatementKind::Count => SqlStatement::query(
                format!("SELECT COUNT(*) AS \"count\" FROM ({})", sql),
                params,
            ),
            StatementKind::Update(_) | StatementKind::Delete => {
                if self.returning.is_some() {
                    SqlStatement::query(sql, params)
                } else {
                    SqlStatement::execute(sql, params)
                }
            }
        }
    }
}

/// 构建 INSERT 语句
///
/// - 所有记录字段序列相同: 一条多行 INSERT
/// - 字段序列不同: 每条记录一条语句 (由执行器作为同一工作单元执行)
/// - 空记录使用 `DEFAULT VALUES`
pub fn build_insert(table: &str, rows: &[Map<String, Value>], returning: &Projection) -> Vec<SqlStatement> {
    let table = quote_ident(table);
    let returning_sql = format!(" RETURNING {}", returning.to_sql());

    let uniform = rows.first().map_or(false, |first| {
        !first.is_empty() && rows.iter().all(|row| row.keys().eq(first.keys()))
    });

    if uniform {
        let columns: Vec<String> = rows[0].keys().map(|k| quote_ident(k)).collect();
        let tuple = format!("({})", vec!["?"; columns.len()].join(", "));
        let mut params = Vec::with_capacity(rows.len() * columns.len());
        for row in rows {
            params.extend(row.values().cloned());
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}{}",
            table,
            columns.join(", "),
            vec![tuple; rows.len()].join(", "),
            returning_sql
        );
        return vec![SqlStatement::query(sql, params)];
    }

    rows.iter()
        .map(|row| {
            if row.is_empty() {
                return SqlStatement::query(
                    format!("INSERT INTO {} DEFAULT VALUES{}", table, returning_sql),
                    Vec::new(),
                );
            }
            let columns: Vec<String> = row.keys().map(|k| quote_ident(k)).collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({}){}",
                table,
                columns.join(", "),
                vec!["?"; columns.len()].join(", "),
                returning_sql
            );
            SqlStatement::query(sql, row.values().cloned().collect())
        })
        .collect()
}

/// 清空表 (SQLite 没有 TRUNCATE)
pub fn build_truncate(table: &str) -> SqlStatement {
    SqlStatement::execute(format!("DELETE FROM {}", quote_ident(table)), Vec::new())
}

// ==========================================
// 单元测试
// ==========================================
