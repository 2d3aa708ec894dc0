use crate::err::log_error::LogError;

pub mod log_error;

pub type CResult<T> = Result<T, LogError>;
