// ==========================================
// 通用实体仓储 - 数据库配置
// ==========================================

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 环境变量键
pub mod env_keys {
    pub const DB_PATH: &str = "MODEL_REPOSITORY_DB_PATH";
    pub const BUSY_TIMEOUT_MS: &str = "MODEL_REPOSITORY_BUSY_TIMEOUT_MS";
    pub const FOREIGN_KEYS: &str = "MODEL_REPOSITORY_FOREIGN_KEYS";
    pub const PERF_SQL: &str = "MODEL_REPOSITORY_PERF_SQL";
    pub const SLOW_SQL_MS: &str = "MODEL_REPOSITORY_SLOW_SQL_MS";
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("环境变量 {key} 的值无效: {value}")]
    InvalidValue { key: String, value: String },
}

// ==========================================
// PerfConfig - SQL 观测配置
// ==========================================
/// Debug 构建默认开启语句追踪 (慢 SQL 阈值 50ms),
/// Release 默认关闭 (阈值 200ms)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerfConfig {
    pub sql_trace: bool,
    pub slow_sql_ms: u64,
}

impl Default for PerfConfig {
    fn default() -> Self {
        Self {
            sql_trace: cfg!(debug_assertions),
            slow_sql_ms: if cfg!(debug_assertions) { 50 } else { 200 },
        }
    }
}

// ==========================================
// DatabaseConfig - 连接配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 数据库文件路径或 SQLite URI
    pub path: String,
    pub busy_timeout_ms: u64,
    pub foreign_keys: bool,
    pub perf: PerfConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: true,
            perf: PerfConfig::default(),
        }
    }
}

impl DatabaseConfig {
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// 独立命名的共享缓存内存库
    ///
    /// 同一配置打开的多个连接 (主连接 / 事务连接) 看到同一个库。
    pub fn in_memory() -> Self {
        Self::with_path(format!(
            "file:model-repository-{}?mode=memory&cache=shared",
            Uuid::new_v4().simple()
        ))
    }

    /// 从进程环境变量加载
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载, 未设置的项取默认值
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(path) = read(env_keys::DB_PATH) {
            config.path = path;
        }
        if let Some(raw) = read(env_keys::BUSY_TIMEOUT_MS) {
            config.busy_timeout_ms = parse_u64(env_keys::BUSY_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = read(env_keys::FOREIGN_KEYS) {
            config.foreign_keys = parse_bool(env_keys::FOREIGN_KEYS, &raw)?;
        }
        if let Some(raw) = read(env_keys::PERF_SQL) {
            config.perf.sql_trace = parse_bool(env_keys::PERF_SQL, &raw)?;
        }
        if let Some(raw) = read(env_keys::SLOW_SQL_MS) {
            config.perf.slow_sql_ms = parse_u64(env_keys::SLOW_SQL_MS, &raw)?;
        }

        Ok(config)
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse::<u64>().map_err(|_| invalid(key, raw))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        _ => Err(invalid(key, raw)),
    }
}

/// 默认数据库路径
///
/// 优先使用用户数据目录; 开发构建使用独立目录, 避免污染正式数据。
pub fn default_db_path() -> String {
    let mut path = PathBuf::from("./model_repository.db");

    if let Some(data_dir) = dirs::data_dir() {
        let app_dir = if cfg!(debug_assertions) {
            "model-repository-dev"
        } else {
            "model-repository"
        };
        path = data_dir.join(app_dir).join("model_repository.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = DatabaseConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert!(config.foreign_keys);
        assert!(config.path.ends_with("model_repository.db"));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = DatabaseConfig::from_lookup(lookup_from(&[
            (env_keys::DB_PATH, " /tmp/app.db "),
            (env_keys::BUSY_TIMEOUT_MS, "250"),
            (env_keys::FOREIGN_KEYS, "off"),
            (env_keys::PERF_SQL, "YES"),
            (env_keys::SLOW_SQL_MS, "10"),
        ]))
        .unwrap();

        assert_eq!(config.path, "/tmp/app.db");
        assert_eq!(config.busy_timeout_ms, 250);
        assert!(!config.foreign_keys);
        assert!(config.perf.sql_trace);
        assert_eq!(config.perf.slow_sql_ms, 10);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = DatabaseConfig::from_lookup(lookup_from(&[(env_keys::BUSY_TIMEOUT_MS, "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains(env_keys::BUSY_TIMEOUT_MS));

        assert!(DatabaseConfig::from_lookup(lookup_from(&[(env_keys::FOREIGN_KEYS, "maybe")])).is_err());
    }

    #[test]
    fn test_in_memory_paths_are_unique() {
        let a = DatabaseConfig::in_memory();
        let b = DatabaseConfig::in_memory();
        assert_ne!(a.path, b.path);
        assert!(a.path.contains("mode=memory"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: DatabaseConfig =
            serde_json::from_str(r#"{"path": "x.db", "perf": {"slow_sql_ms": 5}}"#).unwrap();
        assert_eq!(config.path, "x.db");
        assert_eq!(config.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert_eq!(config.perf.slow_sql_ms, 5);
    }
}
