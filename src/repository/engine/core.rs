use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::db::SqliteExecutor;
use super::decode::decode_record;
use crate::repository::error::{DatabaseError, DatabaseErrorKind, RepositoryResult, StoreError};
use crate::repository::executor::{Executor, OutputCheck, Record, StatementOutput, UnitOfWork};
use crate::repository::statement::SqlStatement;
use crate::repository::translator::{ErrorTranslator, Failure};

/// 可被仓储管理的实体
///
/// 引擎只通过 serde 看到实体的字段, 不了解其结构。
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Entity for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

// ==========================================
// Repository - 通用实体仓储
// ==========================================
/// 绑定到单表的通用仓储
///
/// 执行器由调用方显式注入 (不依赖进程级单例)。
pub struct Repository<T, E: Executor = SqliteExecutor> {
    table_name: String,
    executor: Arc<E>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, E: Executor> Clone for Repository<T, E> {
    fn clone(&self) -> Self {
        Self {
            table_name: self.table_name.clone(),
            executor: Arc::clone(&self.executor),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity, E: Executor> Repository<T, E> {
    pub fn new(table_name: impl Into<String>, executor: Arc<E>) -> Self {
        Self {
            table_name: table_name.into(),
            executor,
            _entity: PhantomData,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// 执行单条语句
    pub(super) async fn run_one(
        &self,
        op: &'static str,
        statement: SqlStatement,
        transaction: Option<&E::Transaction>,
    ) -> Result<StatementOutput, Failure> {
        let mut outputs = self
            .run_unit(op, UnitOfWork::single(statement), transaction)
            .await?;
        Ok(outputs.pop().unwrap_or_default())
    }

    /// 执行一个工作单元
    pub(super) async fn run_unit(
        &self,
        op: &'static str,
        unit: UnitOfWork,
        transaction: Option<&E::Transaction>,
    ) -> Result<Vec<StatementOutput>, Failure> {
        tracing::debug!(
            table = %self.table_name,
            op,
            statements = unit.statements.len(),
            checked = unit.check.is_some(),
            in_transaction = transaction.is_some(),
            "执行仓储操作"
        );
        Ok(self.executor.run(op, unit, transaction).await?)
    }

    /// 零行影响的语义失败
    pub(super) fn semantic_failure(&self, kind: DatabaseErrorKind) -> Failure {
        DatabaseError::for_table(kind, &self.table_name).into()
    }

    /// 按 to_throw 策略收尾: 翻译失败, 抛出或降级为空值
    pub(super) fn settle<R>(
        &self,
        outcome: Result<R, Failure>,
        to_throw: bool,
        empty: impl FnOnce() -> R,
    ) -> RepositoryResult<R> {
        match outcome {
            Ok(value) => Ok(value),
            Err(failure) => {
                let err = ErrorTranslator::new(&self.table_name).translate(failure);
                if to_throw {
                    return Err(err);
                }
                tracing::warn!(
                    table = %self.table_name,
                    kind = %err.kind(),
                    error_id = %err.error_id(),
                    "仓储操作失败已按 to_throw=false 降级为空结果"
                );
                Ok(empty())
            }
        }
    }
}

/// 实体 → 记录, 丢弃 null 字段 (未提供的字段交给列默认值)
pub(super) fn to_record<P: Serialize + ?Sized>(value: &P) -> Result<Record, Failure> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => Err(Failure::from(<serde_json::Error as serde::ser::Error>::custom(
            format!("实体必须序列化为对象, 实际为: {}", other),
        ))),
    }
}

/// 记录 → 实体
pub(super) fn decode_rows<T: Entity>(rows: Vec<Record>) -> Result<Vec<T>, Failure> {
    rows.into_iter()
        .map(|row| decode_record(row).map_err(Failure::from))
        .collect()
}

/// 写操作的结果校验: 返回行必须能解码为实体
///
/// 校验在工作单元内执行, 解码失败时写入随单元一起撤销,
/// 调用方看到的失败与存储状态一致。
pub(super) fn decodable_rows<T: Entity>() -> OutputCheck {
    Arc::new(|outputs: &[StatementOutput]| {
        for row in outputs.iter().flat_map(|output| output.rows.iter()) {
            decode_record::<T>(row.clone()).map_err(StoreError::Decode)?;
        }
        Ok(())
    })
}
