// ==========================================
// 通用实体仓储 - 数据仓储层
// ==========================================
// 职责: 类型化 CRUD 门面 + 查询 DSL, 屏蔽数据库细节
// 约束: 所有查询使用参数化, 防止 SQL 注入
//       Repository 不含业务逻辑, 只认表名与实体字段
// ==========================================

pub mod engine;
pub mod error;
pub mod executor;
pub mod options;
pub mod predicate;
pub mod projection;
pub mod statement;
pub mod translator;

// 重导出核心类型
pub use engine::{Entity, Repository};
pub use error::{DatabaseError, DatabaseErrorKind, RepositoryResult, StoreError};
pub use executor::{Executor, OutputCheck, Record, StatementOutput, UnitOfWork};
pub use options::{ExecOptions, ReadOptions};
pub use predicate::{compile, Clause, Condition, Operators};
pub use projection::{ColumnSelection, Projection};
pub use statement::{SqlQueryBuilder, SqlStatement};
pub use translator::ErrorTranslator;
