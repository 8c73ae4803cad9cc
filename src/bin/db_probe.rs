// ==========================================
// 通用实体仓储 - 数据库探活工具
// ==========================================
// 用法: cargo run --bin db_probe -- [table_name] [locale]
// 连接配置读取 MODEL_REPOSITORY_* 环境变量
// 指定表名时通过仓储引擎统计该表行数
// ==========================================

use anyhow::Context;
use model_repository::{
    logging, ColumnSelection, DatabaseConfig, ReadOptions, Record, Repository, SqliteDatabase,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let table = args.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let locale = args.next().unwrap_or_else(|| "en".to_string());

    let config = DatabaseConfig::from_env().context("invalid MODEL_REPOSITORY_* configuration")?;
    tracing::info!(path = %config.path, "db_probe 启动");

    let mut db = SqliteDatabase::new(config);
    if let Err(err) = db.connect() {
        anyhow::bail!("{} (error_id={})", err.localized(&locale), err.error_id());
    }

    let online = db.is_online().await;
    println!("online={}", online);

    if let Some(table) = table {
        let executor = db.executor().map_err(|e| anyhow::anyhow!(e.localized(&locale)))?;
        let repo: Repository<Record> = Repository::new(table.clone(), executor);

        match repo.count(None, ReadOptions::new()).await {
            Ok(count) => println!("{}.count={}", table, count),
            Err(err) => anyhow::bail!("{} (error_id={})", err.localized(&locale), err.error_id()),
        }

        // 抽样一行, 便于确认列名
        let sample = repo
            .find_all(&ColumnSelection::all(), ReadOptions::new().limit(1).no_throw())
            .await
            .map_err(|e| anyhow::anyhow!(e.localized(&locale)))?;
        if let Some(row) = sample.first() {
            println!("{}.columns={}", table, row.keys().cloned().collect::<Vec<_>>().join(","));
        }
    }

    db.disconnect()
        .map_err(|e| anyhow::anyhow!(e.localized(&locale)))?;
    Ok(())
}
