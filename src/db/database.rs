// ==========================================
// 通用实体仓储 - 数据库生命周期
// ==========================================
// connect → executor() 交给仓储 → begin() 开启事务 → disconnect
// 未连接时所有操作返回 DB_NOT_CONNECTED
// ==========================================

use std::sync::{Arc, Mutex};

use super::connection::open_sqlite_connection;
use super::executor::SqliteExecutor;
use super::transaction::Transaction;
use crate::config::DatabaseConfig;
use crate::repository::error::{DatabaseError, DatabaseErrorKind, RepositoryResult, StoreError};
use crate::repository::executor::{Executor, UnitOfWork};
use crate::repository::statement::SqlStatement;

pub struct SqliteDatabase {
    config: DatabaseConfig,
    executor: Option<SqliteExecutor>,
}

impl SqliteDatabase {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            executor: None,
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// 建立主连接; 已连接时直接返回
    pub fn connect(&mut self) -> RepositoryResult<&mut Self> {
        if self.is_connected() {
            return Ok(self);
        }

        let conn = open_sqlite_connection(&self.config).map_err(|e| {
            let err = DatabaseError::new(DatabaseErrorKind::DbConnectionError);
            tracing::error!(
                path = %self.config.path,
                error_id = %err.error_id(),
                error = %e,
                "数据库连接失败"
            );
            err.with_cause(e)
        })?;

        self.executor = Some(SqliteExecutor::new(Arc::new(Mutex::new(Some(conn)))));
        tracing::info!(path = %self.config.path, "数据库已连接");
        Ok(self)
    }

    pub fn is_connected(&self) -> bool {
        self.executor.as_ref().map_or(false, SqliteExecutor::is_open)
    }

    /// 仓储使用的执行器
    pub fn executor(&self) -> RepositoryResult<Arc<SqliteExecutor>> {
        match &self.executor {
            Some(executor) if executor.is_open() => Ok(Arc::new(executor.clone())),
            _ => Err(DatabaseError::new(DatabaseErrorKind::DbNotConnected)),
        }
    }

    /// 健康检查 (`SELECT 1`)
    pub async fn is_online(&self) -> bool {
        let executor = match self.executor() {
            Ok(executor) => executor,
            Err(_) => return false,
        };

        match executor
            .run(
                "db.is_online",
                UnitOfWork::single(SqlStatement::query("SELECT 1", Vec::new())),
                None,
            )
            .await
        {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(error = %err, "数据库健康检查失败");
                false
            }
        }
    }

    /// 开启调用方持有的事务
    pub async fn begin(&self) -> RepositoryResult<Transaction> {
        if !self.is_connected() {
            return Err(DatabaseError::new(DatabaseErrorKind::DbNotConnected));
        }
        Transaction::begin(&self.config).await
    }

    /// 执行一段 DDL / 批量 SQL (建表、迁移脚本)
    pub async fn execute_batch(&self, sql: &str) -> RepositoryResult<()> {
        let executor = self.executor()?;
        let sql = sql.to_string();
        let conn = executor.shared_connection();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let guard = conn
                .lock()
                .map_err(|e| StoreError::LockError(e.to_string()))?;
            let conn = guard.as_ref().ok_or(StoreError::NotConnected)?;
            conn.execute_batch(&sql)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))
        .and_then(|r| r)
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::OtherDatabaseError).with_cause(e))
    }

    /// 关闭主连接; 已取得的执行器随之失效
    pub fn disconnect(&mut self) -> RepositoryResult<()> {
        let executor = match self.executor.take() {
            Some(executor) => executor,
            None => return Ok(()),
        };

        executor.close().map_err(|e| {
            let err = DatabaseError::new(DatabaseErrorKind::DbDisconnectError);
            tracing::error!(error_id = %err.error_id(), error = %e, "数据库断开失败");
            err.with_cause(e)
        })?;
        tracing::info!(path = %self.config.path, "数据库已断开");
        Ok(())
    }
}

impl Drop for SqliteDatabase {
    fn drop(&mut self) {
        if let Some(executor) = self.executor.take() {
            if let Err(err) = executor.close() {
                tracing::warn!(path = %self.config.path, error = %err, "数据库连接关闭失败");
            }
        }
    }
}
