// ==========================================
// 通用实体仓储 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有连接的 PRAGMA 行为 (外键 / busy_timeout)
// - 统一安装 SQL 观测回调
// ==========================================

use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

use crate::config::DatabaseConfig;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection, config: &DatabaseConfig) -> rusqlite::Result<()> {
    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {};", foreign_keys))?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
///
/// 普通文件路径会先创建父目录；URI 与 `:memory:` 原样交给 SQLite。
pub fn open_sqlite_connection(config: &DatabaseConfig) -> Result<Connection, Box<dyn std::error::Error + Send + Sync>> {
    ensure_parent_dir(&config.path)?;

    let mut conn = Connection::open(&config.path)?;
    configure_sqlite_connection(&conn, config)?;
    crate::perf::install_sqlite_tracing(&mut conn, &config.perf);
    Ok(conn)
}

fn ensure_parent_dir(path: &str) -> std::io::Result<()> {
    if path.starts_with("file:") || path == ":memory:" {
        return Ok(());
    }
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            std::fs::create_dir_all(parent)
        }
        _ => Ok(()),
    }
}
