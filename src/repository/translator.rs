// ==========================================
// 通用实体仓储 - 驱动错误翻译
// ==========================================
// 职责: 将存储层失败映射为封闭的领域错误类别
// 约束: 只做"信号 → 类别"映射, 不解读业务含义
//       已是领域错误的失败原样返回 (幂等)
// ==========================================

use rusqlite::ffi;

use crate::repository::error::{DatabaseError, DatabaseErrorKind, StoreError};

/// PostgreSQL 唯一约束冲突 SQLSTATE
const SQLSTATE_UNIQUE_VIOLATION: &str = "23505";

/// 一次操作中出现的失败 (尚未翻译)
#[derive(Debug)]
pub enum Failure {
    Domain(DatabaseError),
    Store(StoreError),
}

impl From<DatabaseError> for Failure {
    fn from(err: DatabaseError) -> Self {
        Failure::Domain(err)
    }
}

impl From<StoreError> for Failure {
    fn from(err: StoreError) -> Self {
        Failure::Store(err)
    }
}

impl From<serde_json::Error> for Failure {
    fn from(err: serde_json::Error) -> Self {
        Failure::Store(StoreError::Decode(err))
    }
}

// ==========================================
// ErrorTranslator
// ==========================================
pub struct ErrorTranslator<'a> {
    table_name: &'a str,
}

impl<'a> ErrorTranslator<'a> {
    pub fn new(table_name: &'a str) -> Self {
        Self { table_name }
    }

    pub fn translate(&self, failure: Failure) -> DatabaseError {
        let store_err = match failure {
            Failure::Domain(err) => return err,
            Failure::Store(err) => err,
        };

        let translated = if let Some(constraint) = unique_violation(&store_err) {
            DatabaseError::for_table(DatabaseErrorKind::ModelUniqueConstraintError, self.table_name)
                .with_interpolation("constraint", constraint)
        } else if matches!(store_err, StoreError::NotConnected) {
            DatabaseError::new(DatabaseErrorKind::DbNotConnected)
        } else {
            DatabaseError::new(DatabaseErrorKind::OtherDatabaseError)
        };

        tracing::warn!(
            table = self.table_name,
            kind = %translated.kind(),
            error_id = %translated.error_id(),
            cause = %store_err,
            "存储层错误已翻译"
        );

        translated.with_cause(store_err)
    }
}

/// 识别唯一约束冲突信号, 返回约束标识
fn unique_violation(err: &StoreError) -> Option<String> {
    match err {
        StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, message))
            if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            Some(sqlite_constraint_name(message.as_deref()))
        }
        StoreError::Driver {
            code, constraint, ..
        } if code == SQLSTATE_UNIQUE_VIOLATION => {
            Some(constraint.clone().unwrap_or_else(|| "unknown".to_string()))
        }
        _ => None,
    }
}

/// SQLite 不提供约束名, 用消息中的列清单代替
///
/// "UNIQUE constraint failed: users.email" → "users.email"
fn sqlite_constraint_name(message: Option<&str>) -> String {
    message
        .and_then(|m| m.split_once("constraint failed:"))
        .map(|(_, columns)| columns.trim().to_string())
        .filter(|columns| !columns.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
