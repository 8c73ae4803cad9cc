// ==========================================
// 通用实体仓储 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约束: 领域错误对外只暴露 kind + code + 插值参数
//       底层驱动错误 (cause) 仅用于日志，永不序列化
// ==========================================

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ==========================================
// 错误类别 (封闭集合)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与 i18n 消息键一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatabaseErrorKind {
    // ===== 连接管理 =====
    DbConnectionError,
    DbDisconnectError,
    DbNotConnected,

    // ===== 零行影响 (语义失败) =====
    ModelNotCreated,
    ModelNotFound,
    ModelNotUpdated,
    ModelNotDeleted,

    // ===== 驱动错误翻译 =====
    ModelUniqueConstraintError,
    OtherDatabaseError,
}

impl DatabaseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseErrorKind::DbConnectionError => "DB_CONNECTION_ERROR",
            DatabaseErrorKind::DbDisconnectError => "DB_DISCONNECT_ERROR",
            DatabaseErrorKind::DbNotConnected => "DB_NOT_CONNECTED",
            DatabaseErrorKind::ModelNotCreated => "MODEL_NOT_CREATED",
            DatabaseErrorKind::ModelNotFound => "MODEL_NOT_FOUND",
            DatabaseErrorKind::ModelNotUpdated => "MODEL_NOT_UPDATED",
            DatabaseErrorKind::ModelNotDeleted => "MODEL_NOT_DELETED",
            DatabaseErrorKind::ModelUniqueConstraintError => "MODEL_UNIQUE_CONSTRAINT_ERROR",
            DatabaseErrorKind::OtherDatabaseError => "OTHER_DATABASE_ERROR",
        }
    }

    /// HTTP 风格错误码
    ///
    /// 上游据此选择响应状态；数据库层的错误统一为 500。
    pub fn code(&self) -> u16 {
        500
    }

    /// i18n 消息键，例如 `error.errorDatabase.MODEL_NOT_FOUND`
    pub fn message_key(&self) -> String {
        format!("error.errorDatabase.{}", self.as_str())
    }

    /// 是否为"零行影响"类的语义失败
    pub fn is_empty_outcome(&self) -> bool {
        matches!(
            self,
            DatabaseErrorKind::ModelNotCreated
                | DatabaseErrorKind::ModelNotFound
                | DatabaseErrorKind::ModelNotUpdated
                | DatabaseErrorKind::ModelNotDeleted
        )
    }
}

impl fmt::Display for DatabaseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// DatabaseError - 领域错误
// ==========================================
/// 仓储层对外的唯一错误类型
///
/// 序列化结果形如 `{ "kind", "code", "interpolation", "errorId" }`，
/// `cause` 字段被跳过。
#[derive(Error, Debug, Serialize)]
#[error("{}", .kind.message_key())]
#[serde(rename_all = "camelCase")]
pub struct DatabaseError {
    kind: DatabaseErrorKind,
    code: u16,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    interpolation: BTreeMap<String, String>,
    error_id: Uuid,
    #[source]
    #[serde(skip)]
    cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind) -> Self {
        Self {
            kind,
            code: kind.code(),
            interpolation: BTreeMap::new(),
            error_id: Uuid::new_v4(),
            cause: None,
        }
    }

    /// 带表名插值的错误 (`interpolation.tableName`)
    pub fn for_table(kind: DatabaseErrorKind, table_name: &str) -> Self {
        Self::new(kind).with_interpolation("tableName", table_name)
    }

    pub fn with_interpolation(mut self, key: &str, value: impl Into<String>) -> Self {
        self.interpolation.insert(key.to_string(), value.into());
        self
    }

    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        self.cause = Some(cause.into());
        self
    }

    pub fn kind(&self) -> DatabaseErrorKind {
        self.kind
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn interpolation(&self) -> &BTreeMap<String, String> {
        &self.interpolation
    }

    pub fn error_id(&self) -> Uuid {
        self.error_id
    }

    /// 底层原因，仅供日志使用
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// 见 [`DatabaseErrorKind::is_empty_outcome`]
    pub fn is_empty_outcome(&self) -> bool {
        self.kind.is_empty_outcome()
    }

    /// 按指定语言渲染错误消息
    pub fn localized(&self, locale: &str) -> String {
        let args: Vec<(&str, &str)> = self
            .interpolation
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        crate::i18n::t_in(locale, &self.kind.message_key(), &args)
    }
}

// ==========================================
// StoreError - 存储驱动边界错误
// ==========================================
/// Executor 返回的原始失败，经 ErrorTranslator 翻译后才会交给调用方
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// 非 SQLite 驱动的失败信号 (例如 PostgreSQL SQLSTATE)
    #[error("数据库驱动错误 (code={code}): {message}")]
    Driver {
        code: String,
        constraint: Option<String>,
        message: String,
    },

    #[error("数据库连接未建立或已关闭")]
    NotConnected,

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("后台任务执行失败: {0}")]
    Task(String),

    #[error("结果解码失败: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        let json = serde_json::to_string(&DatabaseErrorKind::ModelUniqueConstraintError).unwrap();
        assert_eq!(json, "\"MODEL_UNIQUE_CONSTRAINT_ERROR\"");
        assert_eq!(DatabaseErrorKind::DbNotConnected.as_str(), "DB_NOT_CONNECTED");
        assert_eq!(
            DatabaseErrorKind::ModelNotFound.message_key(),
            "error.errorDatabase.MODEL_NOT_FOUND"
        );
    }

    #[test]
    fn test_serialize_never_exposes_cause() {
        let err = DatabaseError::for_table(DatabaseErrorKind::OtherDatabaseError, "users")
            .with_cause(StoreError::LockError("poisoned: secret detail".to_string()));

        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "OTHER_DATABASE_ERROR");
        assert_eq!(value["code"], 500);
        assert_eq!(value["interpolation"]["tableName"], "users");
        assert!(value.get("errorId").is_some());
        assert!(value.get("cause").is_none());
        assert!(!value.to_string().contains("secret detail"));

        // 日志侧仍可取到原因
        assert!(err.cause().unwrap().to_string().contains("secret detail"));
    }

    #[test]
    fn test_interpolation_skipped_when_empty() {
        let value = serde_json::to_value(DatabaseError::new(DatabaseErrorKind::DbNotConnected)).unwrap();
        assert!(value.get("interpolation").is_none());
    }

    #[test]
    fn test_empty_outcome_kinds() {
        assert!(DatabaseErrorKind::ModelNotCreated.is_empty_outcome());
        assert!(DatabaseErrorKind::ModelNotDeleted.is_empty_outcome());
        assert!(!DatabaseErrorKind::ModelUniqueConstraintError.is_empty_outcome());
        assert!(!DatabaseErrorKind::OtherDatabaseError.is_empty_outcome());
    }

    #[test]
    fn test_display_is_message_key() {
        let err = DatabaseError::new(DatabaseErrorKind::ModelNotUpdated);
        assert_eq!(err.to_string(), "error.errorDatabase.MODEL_NOT_UPDATED");
    }
}
