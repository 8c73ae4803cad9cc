// ==========================================
// 通用实体仓储 - 调用方持有的事务句柄
// ==========================================
// 每个事务独占一条连接 (BEGIN IMMEDIATE), 与仓储共享连接互不干扰
// 生命周期: begin → 若干仓储操作 → commit / rollback
// 未结束即被丢弃时自动回滚
// ==========================================

use std::fmt;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use super::connection::open_sqlite_connection;
use super::SharedConnection;
use crate::config::DatabaseConfig;
use crate::repository::error::{DatabaseError, DatabaseErrorKind, RepositoryResult, StoreError};

pub struct Transaction {
    id: Uuid,
    conn: SharedConnection,
    open: bool,
}

impl Transaction {
    /// 打开新连接并开启写事务
    pub(crate) async fn begin(config: &DatabaseConfig) -> RepositoryResult<Self> {
        let config = config.clone();
        let conn = tokio::task::spawn_blocking(move || {
            let conn = open_sqlite_connection(&config)
                .map_err(|e| DatabaseError::new(DatabaseErrorKind::DbConnectionError).with_cause(e))?;
            conn.execute_batch("BEGIN IMMEDIATE")
                .map_err(|e| DatabaseError::new(DatabaseErrorKind::OtherDatabaseError).with_cause(e))?;
            Ok::<_, DatabaseError>(conn)
        })
        .await
        .map_err(|e| {
            DatabaseError::new(DatabaseErrorKind::OtherDatabaseError)
                .with_cause(StoreError::Task(e.to_string()))
        })??;

        let tx = Self {
            id: Uuid::new_v4(),
            conn: Arc::new(Mutex::new(Some(conn))),
            open: true,
        };
        tracing::debug!(transaction_id = %tx.id, "事务已开启");
        Ok(tx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn shared_connection(&self) -> SharedConnection {
        self.conn.clone()
    }

    pub async fn commit(mut self) -> RepositoryResult<()> {
        self.finish("COMMIT").await
    }

    pub async fn rollback(mut self) -> RepositoryResult<()> {
        self.finish("ROLLBACK").await
    }

    async fn finish(&mut self, command: &'static str) -> RepositoryResult<()> {
        self.open = false;
        let conn = self.conn.clone();
        let id = self.id;

        let result = tokio::task::spawn_blocking(move || end_transaction(&conn, command))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))
            .and_then(|r| r);

        match result {
            Ok(()) => {
                tracing::debug!(transaction_id = %id, command, "事务已结束");
                Ok(())
            }
            Err(err) => {
                let translated = DatabaseError::new(DatabaseErrorKind::OtherDatabaseError);
                tracing::warn!(
                    transaction_id = %id,
                    command,
                    error_id = %translated.error_id(),
                    error = %err,
                    "事务结束失败"
                );
                Err(translated.with_cause(err))
            }
        }
    }
}

/// 执行 COMMIT / ROLLBACK 后关闭事务连接
fn end_transaction(conn: &SharedConnection, command: &str) -> Result<(), StoreError> {
    let mut guard = conn
        .lock()
        .map_err(|e| StoreError::LockError(e.to_string()))?;
    let connection = guard.take().ok_or(StoreError::NotConnected)?;
    let result = connection.execute_batch(command);
    if let Err((_, close_err)) = connection.close() {
        tracing::warn!(error = %close_err, "事务连接关闭失败");
    }
    result.map_err(StoreError::from)
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("open", &self.open)
            .finish()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        tracing::warn!(transaction_id = %self.id, "事务未提交即被丢弃, 自动回滚");

        // ROLLBACK 是阻塞调用, 在运行时内时交给 blocking 线程, 不占用异步工作线程。
        // 该任务若未被执行, 连接随闭包释放时 SQLite 同样会回滚未结束的事务
        let conn = self.conn.clone();
        let id = self.id;
        let rollback = move || {
            if let Err(err) = end_transaction(&conn, "ROLLBACK") {
                tracing::warn!(transaction_id = %id, error = %err, "自动回滚失败");
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(rollback);
            }
            Err(_) => rollback(),
        }
    }
}
