//! 宿主 SQL 引擎的窄接口。
//!
//! logger 只依赖 prepare/bind/step/finalize 一层薄面，外加
//! `execute(sql)` 与单值查询。finalize 即 `Drop`。

use common::err::CResult;

pub mod batcher;

/// 一条已 prepare 的语句。绑定参数下标从 1 开始。
pub trait SqlStatement {
    fn bind_int(&mut self, idx: usize, v: i32) -> CResult<()>;

    fn bind_int64(&mut self, idx: usize, v: i64) -> CResult<()>;

    fn bind_text(&mut self, idx: usize, v: &str) -> CResult<()>;

    fn bind_null(&mut self, idx: usize) -> CResult<()>;

    fn step(&mut self) -> CResult<()>;

    fn clear_bindings(&mut self) -> CResult<()>;

    fn reset(&mut self) -> CResult<()>;
}

pub trait SqlDatabase {
    type Statement: SqlStatement;

    fn execute(&self, sql: &str) -> CResult<()>;

    /// 执行只返回一个整数的查询
    fn return_one_int(&self, sql: &str) -> CResult<i64>;

    fn prepare(&self, sql: &str) -> CResult<Self::Statement>;
}
