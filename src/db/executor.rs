// ==========================================
// 通用实体仓储 - SQLite 语句执行器
// ==========================================
// 职责: 在 blocking 线程上执行工作单元, 不占用异步调度线程
// 约束: 多语句或带结果校验的工作单元用 SAVEPOINT 保证原子性
//       (在调用方事务内同样成立); 校验失败时单元内的写入全部撤销
// ==========================================

use async_trait::async_trait;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Number, Value};

use super::transaction::Transaction;
use super::SharedConnection;
use crate::perf::PerfGuard;
use crate::repository::error::StoreError;
use crate::repository::executor::{Executor, Record, StatementOutput, UnitOfWork};
use crate::repository::statement::SqlStatement;

const UNIT_SAVEPOINT: &str = "model_repository_unit";

/// 基于共享连接的执行器
///
/// 克隆开销很小, 所有克隆共享同一连接; 连接被
/// [`SqliteDatabase::disconnect`](super::SqliteDatabase::disconnect) 关闭后
/// 执行返回 [`StoreError::NotConnected`]。
#[derive(Clone, Debug)]
pub struct SqliteExecutor {
    conn: SharedConnection,
}

impl SqliteExecutor {
    pub(crate) fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    pub(crate) fn shared_connection(&self) -> SharedConnection {
        self.conn.clone()
    }

    /// 关闭底层连接 (对所有克隆生效)
    pub(crate) fn close(&self) -> Result<(), StoreError> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))?;
        match guard.take() {
            Some(conn) => conn.close().map_err(|(_, e)| StoreError::Sqlite(e)),
            None => Ok(()),
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.conn
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }
}

#[async_trait]
impl Executor for SqliteExecutor {
    type Transaction = Transaction;

    async fn run(
        &self,
        op: &'static str,
        unit: UnitOfWork,
        transaction: Option<&Transaction>,
    ) -> Result<Vec<StatementOutput>, StoreError> {
        let conn = match transaction {
            Some(tx) => tx.shared_connection(),
            None => self.conn.clone(),
        };

        tokio::task::spawn_blocking(move || run_unit(&conn, op, &unit))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// 在当前线程执行工作单元
pub(crate) fn run_unit(
    conn: &SharedConnection,
    op: &'static str,
    unit: &UnitOfWork,
) -> Result<Vec<StatementOutput>, StoreError> {
    let guard = conn
        .lock()
        .map_err(|e| StoreError::LockError(e.to_string()))?;
    let conn = guard.as_ref().ok_or(StoreError::NotConnected)?;
    let _perf = PerfGuard::new(op);

    if !unit.needs_atomicity() {
        return unit
            .statements
            .iter()
            .map(|statement| execute_statement(conn, statement))
            .collect();
    }

    conn.execute_batch(&format!("SAVEPOINT {}", UNIT_SAVEPOINT))?;
    match execute_checked(conn, unit) {
        Ok(outputs) => {
            conn.execute_batch(&format!("RELEASE {}", UNIT_SAVEPOINT))?;
            Ok(outputs)
        }
        Err(err) => {
            let undo = format!("ROLLBACK TO {0}; RELEASE {0};", UNIT_SAVEPOINT);
            if let Err(rollback_err) = conn.execute_batch(&undo) {
                tracing::warn!(op, error = %rollback_err, "工作单元回滚失败");
            }
            Err(err)
        }
    }
}

fn execute_checked(conn: &Connection, unit: &UnitOfWork) -> Result<Vec<StatementOutput>, StoreError> {
    let outputs = unit
        .statements
        .iter()
        .map(|statement| execute_statement(conn, statement))
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(check) = &unit.check {
        check(&outputs)?;
    }
    Ok(outputs)
}

fn execute_statement(conn: &Connection, statement: &SqlStatement) -> Result<StatementOutput, StoreError> {
    tracing::debug!(sql = %statement.sql, params = statement.params.len(), "执行语句");

    let params: Vec<SqlValue> = statement.params.iter().map(to_sql_value).collect();
    let mut stmt = conn.prepare(&statement.sql)?;

    if !statement.returns_rows {
        let affected = stmt.execute(params_from_iter(params.iter()))?;
        return Ok(StatementOutput {
            rows: Vec::new(),
            affected,
        });
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record: Record = Map::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            record.insert(name.clone(), from_value_ref(row.get_ref(idx)?));
        }
        records.push(record);
    }

    Ok(StatementOutput {
        affected: records.len(),
        rows: records,
    })
}

/// JSON 值 → SQLite 绑定值
///
/// 布尔存为 0/1, 数组与对象存为 JSON 文本。
fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// SQLite 列值 → JSON 值
fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}
