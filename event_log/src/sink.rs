//! 单个日志流的文件落盘。
//!
//! 每个流一个 `LogStream`：打开、按大小轮转、追加、刷盘、关闭。
//! 文件名是 `<base>.<NNNNNNNN>`，8 位十进制后缀；下一个编号每次
//! 都重新扫描目录得出，容忍外部对文件的增删。
//! 所有方法都要求调用方已持有 logger 的写锁。

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{error, info};

use common::err::CResult;

use crate::config::DEFAULT_MAX_LOG_FILE_SIZE;

pub struct LogStream {
    // 诊断信息里的流名
    label: &'static str,
    enabled: bool,
    base_filename: String,
    datadir: String,
    // 当前文件编号，0 表示尚未打开过
    log_file_id: u32,
    logfile: Option<BufWriter<File>>,
    // 当前文件已写入的字节数
    write_pos: u64,
    max_log_file_size: u64,
}

impl LogStream {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            enabled: false,
            base_filename: String::new(),
            datadir: String::new(),
            log_file_id: 0,
            logfile: None,
            write_pos: 0,
            max_log_file_size: DEFAULT_MAX_LOG_FILE_SIZE,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_open(&self) -> bool {
        self.logfile.is_some()
    }

    pub fn cur_pos(&self) -> u64 {
        self.write_pos
    }

    pub fn max_log_file_size(&self) -> u64 {
        self.max_log_file_size
    }

    pub fn log_file_id(&self) -> u32 {
        self.log_file_id
    }

    pub fn set_datadir(&mut self, datadir: &str) {
        self.datadir = datadir.to_string();
    }

    /// 应用新的基础文件名。同名是 no-op；否则关掉当前文件、
    /// 编号归零，新名字非空时重新打开。返回是否发生了切换。
    pub fn apply_base_filename(&mut self, name: &str, max_log_file_size: u64) -> bool {
        self.max_log_file_size = max_log_file_size;
        if self.base_filename == name {
            return false;
        }
        self.close_log_unlocked();
        self.log_file_id = 0;
        self.base_filename = name.to_string();
        if !self.base_filename.is_empty() {
            self.enabled = true;
            self.open_log_unlocked();
        } else {
            self.enabled = false;
        }
        true
    }

    /// 基础文件名以 `/` 开头按绝对路径用，否则挂在 datadir 下
    fn resolved_base(&self) -> PathBuf {
        if self.base_filename.starts_with('/') {
            PathBuf::from(&self.base_filename)
        } else {
            Path::new(&self.datadir).join(&self.base_filename)
        }
    }

    /// 扫描目录，返回该 base 已存在的最大编号，没有则 0。
    ///
    /// 只认长度恰好为 `len(base) + 9`、以 `base` 开头、后面跟 `.`
    /// 和 8 位十进制的文件名。目录打不开视为数据目录丢失，直接
    /// 终止进程。
    pub fn find_next_id(&self) -> u32 {
        let base = self.resolved_base();
        let (scan_dir, file_base) = if self.base_filename.starts_with('/') {
            (
                base.parent().unwrap_or_else(|| Path::new("/")).to_path_buf(),
                base.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
        } else {
            (PathBuf::from(&self.datadir), self.base_filename.clone())
        };

        let entries = match std::fs::read_dir(&scan_dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Unable to open datadir {}: {}", scan_dir.display(), e);
                std::process::exit(1);
            }
        };

        let mut maxidx: u32 = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = match name.to_str() {
                Some(name) => name,
                None => continue,
            };
            if name.len() != file_base.len() + 9 {
                continue;
            }
            if !name.starts_with(file_base.as_str()) {
                continue;
            }
            if name.as_bytes()[file_base.len()] != b'.' {
                continue;
            }
            let idx = name[file_base.len() + 1..].parse::<u32>().unwrap_or(0);
            if idx > maxidx {
                maxidx = idx;
            }
        }
        maxidx
    }

    /// 打开下一个编号的文件。打开失败只记错误并把流置为关闭，
    /// 后续写入静默跳过，直到重新配置。
    pub fn open_log_unlocked(&mut self) {
        let maxidx = self.find_next_id();
        self.log_file_id = if maxidx != 0 { maxidx + 1 } else { 1 };

        let path = format!("{}.{:08}", self.resolved_base().display(), self.log_file_id);
        match OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
        {
            Ok(file) => {
                info!("Starting new {} log file {}", self.label, path);
                self.logfile = Some(BufWriter::new(file));
                self.write_pos = 0;
            }
            Err(e) => {
                error!("Error creating new {} log file {}: {}", self.label, path, e);
                self.logfile = None;
            }
        }
    }

    pub fn close_log_unlocked(&mut self) {
        if let Some(mut logfile) = self.logfile.take() {
            if let Err(e) = logfile.flush() {
                error!("Error flushing {} log file: {}", self.label, e);
            }
        }
    }

    /// 关掉再打开 = 轮转到下一个编号
    pub fn flush_log_unlocked(&mut self) {
        if !self.enabled {
            return;
        }
        self.close_log_unlocked();
        self.open_log_unlocked();
    }

    /// 追加一条已编码的记录
    pub fn write_unlocked(&mut self, bytes: &[u8]) -> CResult<()> {
        if let Some(logfile) = self.logfile.as_mut() {
            logfile.write_all(bytes)?;
            self.write_pos += bytes.len() as u64;
        }
        Ok(())
    }

    /// 把缓冲推给操作系统
    pub fn sync(&mut self) -> CResult<()> {
        if let Some(logfile) = self.logfile.as_mut() {
            logfile.flush()?;
        }
        Ok(())
    }
}
