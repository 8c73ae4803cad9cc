// ==========================================
// 通用实体仓储 - 数据库基础设施 (SQLite)
// ==========================================
// 职责: 连接生命周期 (connect / disconnect / 健康检查)、
//       语句执行器、调用方持有的事务句柄
// ==========================================

pub mod connection;
pub mod database;
pub mod executor;
pub mod transaction;

pub use connection::{configure_sqlite_connection, open_sqlite_connection};
pub use database::SqliteDatabase;
pub use executor::SqliteExecutor;
pub use transaction::Transaction;

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// 可被关闭的共享连接: `None` 表示已断开
pub(crate) type SharedConnection = Arc<Mutex<Option<Connection>>>;
