// ==========================================
// 通用实体仓储 - 操作选项
// ==========================================
// to_throw: 默认 true, 失败以 Err 返回;
//           false 时记录 warn 日志并返回空值 ([] / 0 / None)
// transaction: 调用方持有的事务句柄, 操作内所有语句都在其上执行
// ==========================================

use std::fmt;

use crate::db::Transaction;

/// 写操作 / 单行读取选项
pub struct ExecOptions<'a, Tx = Transaction> {
    pub transaction: Option<&'a Tx>,
    pub to_throw: bool,
}

impl<'a, Tx> ExecOptions<'a, Tx> {
    pub fn new() -> Self {
        Self {
            transaction: None,
            to_throw: true,
        }
    }

    pub fn in_transaction(mut self, transaction: &'a Tx) -> Self {
        self.transaction = Some(transaction);
        self
    }

    /// 失败时返回空值而不是 Err
    pub fn no_throw(mut self) -> Self {
        self.to_throw = false;
        self
    }
}

impl<Tx> Default for ExecOptions<'_, Tx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Tx> Clone for ExecOptions<'_, Tx> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Tx> Copy for ExecOptions<'_, Tx> {}

impl<Tx> fmt::Debug for ExecOptions<'_, Tx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecOptions")
            .field("in_transaction", &self.transaction.is_some())
            .field("to_throw", &self.to_throw)
            .finish()
    }
}

/// 多行读取 / 计数选项
pub struct ReadOptions<'a, Tx = Transaction> {
    pub exec: ExecOptions<'a, Tx>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl<'a, Tx> ReadOptions<'a, Tx> {
    pub fn new() -> Self {
        Self {
            exec: ExecOptions::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    pub fn in_transaction(mut self, transaction: &'a Tx) -> Self {
        self.exec = self.exec.in_transaction(transaction);
        self
    }

    pub fn no_throw(mut self) -> Self {
        self.exec = self.exec.no_throw();
        self
    }
}

impl<Tx> Default for ReadOptions<'_, Tx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Tx> Clone for ReadOptions<'_, Tx> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Tx> Copy for ReadOptions<'_, Tx> {}

impl<Tx> fmt::Debug for ReadOptions<'_, Tx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOptions")
            .field("exec", &self.exec)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}
