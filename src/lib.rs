// ==========================================
// 通用实体仓储 - 核心库
// ==========================================
// 定位: 后端服务模板的关系型数据访问核心
// 技术栈: Rust + SQLite (rusqlite) + tokio
// 能力: 类型化 CRUD、查询 DSL、列投影、事务传递、驱动错误翻译
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 数据仓储层 - 查询 DSL 与仓储引擎
pub mod repository;

// 数据库基础设施（连接生命周期/执行器/事务）
pub mod db;

// 配置层
pub mod config;

// 日志系统
pub mod logging;

// SQL 性能观测
pub mod perf;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::DatabaseConfig;
pub use db::{SqliteDatabase, SqliteExecutor, Transaction};
pub use repository::{
    Clause, ColumnSelection, DatabaseError, DatabaseErrorKind, Entity, ExecOptions, Operators,
    ReadOptions, Record, Repository, RepositoryResult,
};

// ==========================================
// 常量定义
// ==========================================

// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
