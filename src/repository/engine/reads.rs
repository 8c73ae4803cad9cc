use serde_json::Value;

use super::core::{decode_rows, Entity, Repository};
use crate::repository::error::{DatabaseErrorKind, RepositoryResult, StoreError};
use crate::repository::executor::Executor;
use crate::repository::options::{ExecOptions, ReadOptions};
use crate::repository::predicate::{compile, Clause};
use crate::repository::projection::ColumnSelection;
use crate::repository::statement::SqlQueryBuilder;
use crate::repository::translator::Failure;

impl<T: Entity, E: Executor> Repository<T, E> {
    /// 按检索规格查询
    ///
    /// # 返回
    /// - Ok(Vec<T>): 匹配的行 (受 limit/offset 限制)
    /// - Err(MODEL_NOT_FOUND): 没有匹配行
    pub async fn find(
        &self,
        clauses: &[Clause],
        columns: &ColumnSelection,
        options: ReadOptions<'_, E::Transaction>,
    ) -> RepositoryResult<Vec<T>> {
        let outcome = self.try_find(clauses, columns, &options).await;
        self.settle(outcome, options.exec.to_throw, Vec::new)
    }

    /// 查询第一条匹配行
    ///
    /// to_throw=false 时未找到返回 Ok(None)。
    pub async fn find_one(
        &self,
        clauses: &[Clause],
        columns: &ColumnSelection,
        options: ExecOptions<'_, E::Transaction>,
    ) -> RepositoryResult<Option<T>> {
        let read = ReadOptions {
            exec: options,
            limit: Some(1),
            offset: None,
        };
        let outcome = self
            .try_find(clauses, columns, &read)
            .await
            .map(|rows| rows.into_iter().next());
        self.settle(outcome, options.to_throw, || None)
    }

    /// 查询整表
    pub async fn find_all(
        &self,
        columns: &ColumnSelection,
        options: ReadOptions<'_, E::Transaction>,
    ) -> RepositoryResult<Vec<T>> {
        let outcome = self.try_find(&[], columns, &options).await;
        self.settle(outcome, options.exec.to_throw, Vec::new)
    }

    async fn try_find(
        &self,
        clauses: &[Clause],
        columns: &ColumnSelection,
        options: &ReadOptions<'_, E::Transaction>,
    ) -> Result<Vec<T>, Failure> {
        let statement = SqlQueryBuilder::select(self.table_name(), &columns.resolve())
            .where_condition(compile(clauses))
            .limit(options.limit)
            .offset(options.offset)
            .build();
        let output = self
            .run_one("repository.find", statement, options.exec.transaction)
            .await?;

        if output.rows.is_empty() {
            return Err(self.semantic_failure(DatabaseErrorKind::ModelNotFound));
        }
        decode_rows(output.rows)
    }

    /// 计数; `clauses` 为 None 时统计整表
    ///
    /// 计数为 0 不是失败。
    pub async fn count(
        &self,
        clauses: Option<&[Clause]>,
        options: ReadOptions<'_, E::Transaction>,
    ) -> RepositoryResult<u64> {
        let outcome = self.try_count(clauses, &options).await;
        self.settle(outcome, options.exec.to_throw, || 0)
    }

    async fn try_count(
        &self,
        clauses: Option<&[Clause]>,
        options: &ReadOptions<'_, E::Transaction>,
    ) -> Result<u64, Failure> {
        let statement = SqlQueryBuilder::count(self.table_name())
            .where_condition(clauses.and_then(compile))
            .limit(options.limit)
            .offset(options.offset)
            .build();
        let output = self
            .run_one("repository.count", statement, options.exec.transaction)
            .await?;

        output
            .rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                Failure::from(StoreError::Decode(<serde_json::Error as serde::de::Error>::custom(
                    "计数结果缺少 count 列",
                )))
            })
    }
}
