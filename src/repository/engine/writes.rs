use serde::Serialize;

use super::core::{decodable_rows, decode_rows, to_record, Entity, Repository};
use crate::repository::error::{DatabaseErrorKind, RepositoryResult};
use crate::repository::executor::{Executor, Record, UnitOfWork};
use crate::repository::options::ExecOptions;
use crate::repository::predicate::{compile, Clause};
use crate::repository::projection::ColumnSelection;
use crate::repository::statement::{build_insert, build_truncate, SqlQueryBuilder};
use crate::repository::translator::Failure;

impl<T: Entity, E: Executor> Repository<T, E> {
    /// 批量创建实体, 返回按投影取回的新行
    ///
    /// # 返回
    /// - Ok(Vec<T>): 创建的行
    /// - Err(MODEL_NOT_CREATED): 没有任何行被创建 (包括传入空列表)
    /// - Err(MODEL_UNIQUE_CONSTRAINT_ERROR): 唯一约束冲突
    pub async fn insert(
        &self,
        entities: &[T],
        columns: &ColumnSelection,
        options: ExecOptions<'_, E::Transaction>,
    ) -> RepositoryResult<Vec<T>> {
        let outcome = self.try_insert(entities, columns, options.transaction).await;
        self.settle(outcome, options.to_throw, Vec::new)
    }

    async fn try_insert(
        &self,
        entities: &[T],
        columns: &ColumnSelection,
        transaction: Option<&E::Transaction>,
    ) -> Result<Vec<T>, Failure> {
        if entities.is_empty() {
            return Err(self.semantic_failure(DatabaseErrorKind::ModelNotCreated));
        }

        let rows = entities
            .iter()
            .map(to_record)
            .collect::<Result<Vec<Record>, Failure>>()?;
        let unit = UnitOfWork::new(build_insert(self.table_name(), &rows, &columns.resolve()))
            .with_check(decodable_rows::<T>());

        let created: Vec<Record> = self
            .run_unit("repository.insert", unit, transaction)
            .await?
            .into_iter()
            .flat_map(|output| output.rows)
            .collect();

        if created.is_empty() {
            return Err(self.semantic_failure(DatabaseErrorKind::ModelNotCreated));
        }
        decode_rows(created)
    }

    /// 按检索规格更新, 返回按投影取回的已更新行
    ///
    /// `patch` 中的 null 字段视为未提供; 空 patch 直接视为未更新。
    pub async fn update<P: Serialize + ?Sized>(
        &self,
        patch: &P,
        clauses: &[Clause],
        columns: &ColumnSelection,
        options: ExecOptions<'_, E::Transaction>,
    ) -> RepositoryResult<Vec<T>> {
        let outcome = self
            .try_update(patch, clauses, columns, options.transaction)
            .await;
        self.settle(outcome, options.to_throw, Vec::new)
    }

    async fn try_update<P: Serialize + ?Sized>(
        &self,
        patch: &P,
        clauses: &[Clause],
        columns: &ColumnSelection,
        transaction: Option<&E::Transaction>,
    ) -> Result<Vec<T>, Failure> {
        let patch = to_record(patch)?;
        if patch.is_empty() {
            return Err(self.semantic_failure(DatabaseErrorKind::ModelNotUpdated));
        }

        let statement = SqlQueryBuilder::update(self.table_name(), patch)
            .where_condition(compile(clauses))
            .returning(&columns.resolve())
            .build();
        let unit = UnitOfWork::single(statement).with_check(decodable_rows::<T>());
        let output = self
            .run_unit("repository.update", unit, transaction)
            .await?
            .pop()
            .unwrap_or_default();

        if output.rows.is_empty() {
            return Err(self.semantic_failure(DatabaseErrorKind::ModelNotUpdated));
        }
        decode_rows(output.rows)
    }

    /// 按检索规格删除, 返回删除行数
    ///
    /// 空检索规格删除整表。
    pub async fn delete(
        &self,
        clauses: &[Clause],
        options: ExecOptions<'_, E::Transaction>,
    ) -> RepositoryResult<u64> {
        let outcome = self.try_delete(clauses, options.transaction).await;
        self.settle(outcome, options.to_throw, || 0)
    }

    async fn try_delete(
        &self,
        clauses: &[Clause],
        transaction: Option<&E::Transaction>,
    ) -> Result<u64, Failure> {
        let statement = SqlQueryBuilder::delete(self.table_name())
            .where_condition(compile(clauses))
            .build();
        let output = self
            .run_one("repository.delete", statement, transaction)
            .await?;

        if output.affected == 0 {
            return Err(self.semantic_failure(DatabaseErrorKind::ModelNotDeleted));
        }
        Ok(output.affected as u64)
    }

    /// 清空整表 (空表也视为成功)
    pub async fn truncate(&self, options: ExecOptions<'_, E::Transaction>) -> RepositoryResult<()> {
        let outcome = self
            .run_one(
                "repository.truncate",
                build_truncate(self.table_name()),
                options.transaction,
            )
            .await
            .map(|_| ());
        self.settle(outcome, options.to_throw, || ())
    }
}
