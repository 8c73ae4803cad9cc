// ==========================================
// 通用实体仓储 - 配置层
// ==========================================
// 职责: 数据库连接与 SQL 观测配置
// 来源: 环境变量 (MODEL_REPOSITORY_*) 或 serde 反序列化
// ==========================================

pub mod database_config;

// 重导出核心配置
pub use database_config::{default_db_path, ConfigError, DatabaseConfig, PerfConfig};
