// ==========================================
// 通用实体仓储 - 执行器边界
// ==========================================
// 职责: 仓储引擎与连接提供方之间唯一的契约
// 约束: 引擎从不开启/提交/回滚事务, 只把调用方给出的
//       事务句柄原样交给执行器
// ==========================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::repository::error::StoreError;
use crate::repository::statement::SqlStatement;

/// 动态实体: 列名 → 值 (保持列顺序)
pub type Record = Map<String, Value>;

/// 单条语句的执行结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementOutput {
    pub rows: Vec<Record>,
    pub affected: usize,
}

/// 工作单元结束前对全部结果的校验, 返回 Err 时整个单元撤销
pub type OutputCheck = Arc<dyn Fn(&[StatementOutput]) -> Result<(), StoreError> + Send + Sync>;

/// 一个工作单元: 顺序执行的语句 + 可选的结果校验
#[derive(Clone)]
pub struct UnitOfWork {
    pub statements: Vec<SqlStatement>,
    pub check: Option<OutputCheck>,
}

impl UnitOfWork {
    pub fn new(statements: Vec<SqlStatement>) -> Self {
        Self {
            statements,
            check: None,
        }
    }

    pub fn single(statement: SqlStatement) -> Self {
        Self::new(vec![statement])
    }

    pub fn with_check(mut self, check: OutputCheck) -> Self {
        self.check = Some(check);
        self
    }

    /// 是否必须作为原子单元执行
    pub fn needs_atomicity(&self) -> bool {
        self.statements.len() > 1 || self.check.is_some()
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("statements", &self.statements)
            .field("checked", &self.check.is_some())
            .finish()
    }
}

/// 语句执行器 (连接提供方)
///
/// 单元内的语句在同一句柄上顺序执行。多于一条语句或带校验时
/// 要么全部生效要么全部不生效: 任一语句失败或校验返回 Err 都撤销整个单元。
#[async_trait]
pub trait Executor: Send + Sync {
    /// 调用方持有的事务句柄
    type Transaction: Send + Sync;

    async fn run(
        &self,
        op: &'static str,
        unit: UnitOfWork,
        transaction: Option<&Self::Transaction>,
    ) -> Result<Vec<StatementOutput>, StoreError>;
}
