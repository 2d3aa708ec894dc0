use std::io;
use std::num::ParseIntError;
use std::str::Utf8Error;

use thiserror::Error;

/// 日志子系统错误
#[derive(Debug, Error)]
pub enum LogError {
    /// 一定不会出现的异常。如果出现，一定是BUG
    #[error("BUG: {0}")]
    Bug(String),

    #[error(transparent)]
    IoError(#[from] io::Error),

    #[error(transparent)]
    Utf8Error(#[from] Utf8Error),

    #[error(transparent)]
    ParseIntError(#[from] ParseIntError),

    /// Byte code is incomplete
    #[error("incomplete record: {0}")]
    Incomplete(String),

    /// 记录格式错误
    #[error("malformed record: {0}")]
    InvalidData(String),

    /// SQL surface 返回的错误
    #[error("sql error: {0}")]
    SqlError(String),

    #[error("config error: {0}")]
    ConfigErr(String),

    #[error("{0}")]
    String(String),
}
