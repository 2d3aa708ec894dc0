use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// events 流的记录格式
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EventsLogFormat {
    /// 自定界二进制记录（格式 1）
    Binary,
    /// 每行一个 JSON 对象（格式 2）
    Json,
}

/// 宿主写入、logger 读取的可配项。
///
/// 数值字段用 Relaxed 原子读写，宿主随时可以改；两个文件名和
/// datadir 是字符串，走互斥锁。数值的撕裂读在这里是无害的。
#[derive(Debug)]
pub struct LoggerConfig {
    /// events 流的基础文件名，空串关闭该流
    pub events_log_filename: Mutex<String>,
    /// events 文件的轮转阈值，字节
    pub events_log_filesize: AtomicU64,
    /// 1 = 二进制，其余 = JSON
    pub events_log_format: AtomicU32,
    /// 环形缓冲容量，0 关闭缓冲
    pub events_log_buffer_history_size: AtomicUsize,
    /// 深拷贝时查询载荷的截断长度
    pub events_log_buffer_max_query_length: AtomicUsize,
    /// 内存 SQL 表的行数预算
    pub events_log_table_memory_size: AtomicUsize,

    pub audit_log_filename: Mutex<String>,
    pub audit_log_filesize: AtomicU64,

    /// 相对文件名的解析根目录
    pub datadir: Mutex<String>,
}

pub const DEFAULT_MAX_LOG_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const DEFAULT_BUFFER_MAX_QUERY_LENGTH: usize = 1024;
pub const DEFAULT_TABLE_MEMORY_SIZE: usize = 16384;

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            events_log_filename: Mutex::new(String::new()),
            events_log_filesize: AtomicU64::new(DEFAULT_MAX_LOG_FILE_SIZE),
            events_log_format: AtomicU32::new(1),
            events_log_buffer_history_size: AtomicUsize::new(0),
            events_log_buffer_max_query_length: AtomicUsize::new(DEFAULT_BUFFER_MAX_QUERY_LENGTH),
            events_log_table_memory_size: AtomicUsize::new(DEFAULT_TABLE_MEMORY_SIZE),
            audit_log_filename: Mutex::new(String::new()),
            audit_log_filesize: AtomicU64::new(DEFAULT_MAX_LOG_FILE_SIZE),
            datadir: Mutex::new(String::new()),
        }
    }
}

impl LoggerConfig {
    pub fn events_format(&self) -> EventsLogFormat {
        if self.events_log_format.load(Ordering::Relaxed) == 1 {
            EventsLogFormat::Binary
        } else {
            EventsLogFormat::Json
        }
    }

    pub fn events_filename(&self) -> String {
        self.events_log_filename.lock().unwrap().clone()
    }

    pub fn set_events_filename(&self, name: &str) {
        *self.events_log_filename.lock().unwrap() = name.to_string();
    }

    pub fn audit_filename(&self) -> String {
        self.audit_log_filename.lock().unwrap().clone()
    }

    pub fn set_audit_filename(&self, name: &str) {
        *self.audit_log_filename.lock().unwrap() = name.to_string();
    }

    pub fn datadir(&self) -> String {
        self.datadir.lock().unwrap().clone()
    }

    pub fn buffer_history_size(&self) -> usize {
        self.events_log_buffer_history_size.load(Ordering::Relaxed)
    }

    pub fn buffer_max_query_length(&self) -> usize {
        self.events_log_buffer_max_query_length.load(Ordering::Relaxed)
    }

    pub fn table_memory_size(&self) -> usize {
        self.events_log_table_memory_size.load(Ordering::Relaxed)
    }
}
