//! 查询与审计事件的落盘门面。
//!
//! 两个流（events、audit）各挂一个文件 sink，共用一把写锁。
//! 锁在真正写盘前一刻才拿，轮转结束即放。环形缓冲有自己的锁，
//! 缓冲操作与文件操作互不重叠。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::info;

use common::err::CResult;
use common::time_util;

use crate::buffer::EventCircularBuffer;
use crate::config::LoggerConfig;
use crate::event::event_kind::LogEventKind;
use crate::event::mysql_event::MysqlEvent;
use crate::event::NO_HOSTGROUP_ID;
use crate::session::{BackendRef, MysqlSession, SessionStatus, COM_STMT_PREPARE};
use crate::sink::LogStream;
use crate::sql::batcher::{self, HISTORY_TABLE, MEMORY_TABLE};
use crate::sql::SqlDatabase;

struct LoggerStreams {
    events: LogStream,
    audit: LogStream,
}

#[derive(Default)]
struct LoggerMetrics {
    memory_copy_count: AtomicU64,
    disk_copy_count: AtomicU64,
    get_all_events_calls_count: AtomicU64,
    get_all_events_events_count: AtomicU64,
    total_memory_copy_time_micros: AtomicU64,
    total_disk_copy_time_micros: AtomicU64,
    total_get_all_events_disk_copy_time_micros: AtomicU64,
    total_events_copied_to_memory: AtomicU64,
    total_events_copied_to_disk: AtomicU64,
}

pub struct EventLogger {
    config: Arc<LoggerConfig>,
    streams: Mutex<LoggerStreams>,
    buffer: EventCircularBuffer,
    metrics: LoggerMetrics,
    // 供写前快速检查用的无锁镜像，随 set_base_filename 更新
    events_enabled: AtomicBool,
    audit_enabled: AtomicBool,
}

impl EventLogger {
    pub fn new(config: Arc<LoggerConfig>) -> Self {
        let buffer = EventCircularBuffer::new(config.buffer_history_size());
        Self {
            config,
            streams: Mutex::new(LoggerStreams {
                events: LogStream::new("mysql event"),
                audit: LogStream::new("audit"),
            }),
            buffer,
            metrics: LoggerMetrics::default(),
            events_enabled: AtomicBool::new(false),
            audit_enabled: AtomicBool::new(false),
        }
    }

    pub fn print_version(&self) {
        info!(
            "Standard MySQL Event Logger rev. {}",
            env!("CARGO_PKG_VERSION")
        );
    }

    pub fn buffer(&self) -> &EventCircularBuffer {
        &self.buffer
    }

    /// 重读 `events_log_filename`/`events_log_filesize` 并应用。
    /// 文件名没变是 no-op；变了就关当前文件、编号归零、按新名重开。
    pub fn events_set_base_filename(&self) {
        let name = self.config.events_filename();
        let max_size = self.config.events_log_filesize.load(Ordering::Relaxed);
        let mut streams = self.streams.lock().unwrap();
        streams.events.apply_base_filename(&name, max_size);
        self.events_enabled
            .store(streams.events.enabled(), Ordering::Relaxed);
    }

    pub fn audit_set_base_filename(&self) {
        let name = self.config.audit_filename();
        let max_size = self.config.audit_log_filesize.load(Ordering::Relaxed);
        let mut streams = self.streams.lock().unwrap();
        streams.audit.apply_base_filename(&name, max_size);
        self.audit_enabled
            .store(streams.audit.enabled(), Ordering::Relaxed);
    }

    pub fn events_set_datadir(&self, datadir: &str) {
        {
            let mut streams = self.streams.lock().unwrap();
            streams.events.set_datadir(datadir);
        }
        self.flush_log();
    }

    pub fn audit_set_datadir(&self, datadir: &str) {
        {
            let mut streams = self.streams.lock().unwrap();
            streams.audit.set_datadir(datadir);
        }
        self.flush_log();
    }

    /// 同步环形缓冲容量到 `events_log_buffer_history_size`
    pub fn apply_buffer_history_size(&self) {
        self.buffer.set_capacity(self.config.buffer_history_size());
    }

    /// 两个流都关掉重开（轮转到新编号）
    pub fn flush_log(&self) {
        if !self.events_enabled.load(Ordering::Relaxed) && !self.audit_enabled.load(Ordering::Relaxed)
        {
            return;
        }
        let mut streams = self.streams.lock().unwrap();
        streams.events.flush_log_unlocked();
        streams.audit.flush_log_unlocked();
    }

    /// 把两个流的写缓冲推给操作系统
    pub fn flush(&self) -> CResult<()> {
        let mut streams = self.streams.lock().unwrap();
        streams.events.sync()?;
        streams.audit.sync()?;
        Ok(())
    }

    /// 记录一条完成的客户端请求。
    ///
    /// 事件就地构建、借用会话数据；写完 events 流后，若缓冲开启，
    /// 深拷贝一份入队。
    pub fn log_request(&self, sess: &MysqlSession, backend: Option<&BackendRef>) -> CResult<()> {
        let buffer_capacity = self.config.buffer_history_size();
        if buffer_capacity == 0 && !self.events_enabled.load(Ordering::Relaxed) {
            return Ok(());
        }
        // RequestEnd 可能落在一个连接复位失败后新建的会话上，
        // 那不是一次客户端请求
        let client = match &sess.client {
            Some(client) => client,
            None => return Ok(()),
        };
        let ui = match &client.conn {
            Some(ui) => ui,
            None => return Ok(()),
        };

        let curtime_real = time_util::realtime_time();
        let curtime_mono = sess.thread_curtime;
        let ca = sess.client_addr_string();

        let mut kind = LogEventKind::Query;
        match sess.status {
            SessionStatus::ProcessingStmtExecute => {
                kind = LogEventKind::StmtExecute;
            }
            SessionStatus::ProcessingStmtPrepare => {
                kind = LogEventKind::StmtPrepare;
            }
            SessionStatus::WaitingClientData => {
                // 命中全局缓存的 COM_STMT_PREPARE 直接回包，会话
                // 停在 waiting 状态，只能从待处理报文里识别
                if sess.pending_command_byte() == Some(COM_STMT_PREPARE) {
                    kind = LogEventKind::StmtPrepare;
                }
            }
            _ => {}
        }

        let q = &sess.current_query;
        let query_digest = if sess.status == SessionStatus::ProcessingStmtExecute {
            q.stmt_info.as_ref().map(|si| si.digest).unwrap_or(0)
        } else {
            q.digest
        };

        let mut event = MysqlEvent::new(
            kind,
            sess.thread_session_id,
            ui.username.as_str(),
            ui.schemaname.as_str(),
            q.start_time + curtime_real - curtime_mono,
            q.end_time + curtime_real - curtime_mono,
            query_digest,
            ca.as_str(),
        );

        let query: &[u8] = match (sess.status, q.stmt_info.as_ref()) {
            (SessionStatus::ProcessingStmtExecute, Some(si)) => &si.query,
            _ => &q.query,
        };
        event.set_query(query);
        event.set_client_stmt_id(q.stmt_client_id);

        if q.have_affected_rows {
            event.set_affected_rows(q.affected_rows, q.last_insert_id);
        }
        event.set_rows_sent(q.rows_sent);
        event.set_gtid(&sess.gtid_buf);

        let sa = backend.map(|b| b.addr_string()).unwrap_or_default();
        if !sa.is_empty() {
            let hid = backend
                .map(|b| b.hostgroup_id as u64)
                .unwrap_or(NO_HOSTGROUP_ID);
            event.set_server(hid, sa.as_str());
        }

        {
            let mut streams = self.streams.lock().unwrap();
            if streams.events.enabled() && streams.events.is_open() {
                let bytes = event.render(self.config.events_format(), sess);
                streams.events.write_unlocked(&bytes)?;
                if streams.events.cur_pos() > streams.events.max_log_file_size() {
                    streams.events.flush_log_unlocked();
                }
            }
        }

        if self.buffer.capacity() != 0 {
            let copied = event.to_buffered(self.config.buffer_max_query_length());
            self.buffer.insert(Box::new(copied));
        }

        Ok(())
    }

    /// 记录一条认证生命周期事件。只走 audit 流，不进缓冲。
    pub fn log_audit(
        &self,
        kind: LogEventKind,
        sess: &MysqlSession,
        backend: Option<&BackendRef>,
        extra_info: Option<&str>,
    ) -> CResult<()> {
        if !self.audit_enabled.load(Ordering::Relaxed) {
            return Ok(());
        }
        let client = match &sess.client {
            Some(client) => client,
            None => return Ok(()),
        };

        let kind = kind.map_for_session(sess.session_type);

        let curtime_real = time_util::realtime_time();
        let ca = sess.client_addr_string();
        let (un, sn) = match &client.conn {
            Some(ui) => (ui.username.as_str(), ui.schemaname.as_str()),
            None => ("", ""),
        };

        let mut event = MysqlEvent::new(
            kind,
            sess.thread_session_id,
            un,
            sn,
            curtime_real,
            0,
            0,
            ca.as_str(),
        );

        let sa = backend.map(|b| b.addr_string()).unwrap_or_default();
        if !sa.is_empty() {
            let hid = backend
                .map(|b| b.hostgroup_id as u64)
                .unwrap_or(NO_HOSTGROUP_ID);
            event.set_server(hid, sa.as_str());
        }

        if let Some(extra_info) = extra_info {
            event.set_extra_info(extra_info);
        }

        let mut streams = self.streams.lock().unwrap();
        if streams.audit.enabled() && streams.audit.is_open() {
            let bytes = event.render(self.config.events_format(), sess);
            streams.audit.write_unlocked(&bytes)?;
            if streams.audit.cur_pos() > streams.audit.max_log_file_size() {
                streams.audit.flush_log_unlocked();
            }
        }

        Ok(())
    }

    /// 清空环形缓冲并批量落到两个 SQL 表。
    ///
    /// 落盘库整表追加；内存库先按行数预算腾位置再插入，最多插
    /// 预算那么多条。返回本次清出的事件数。
    pub fn process_events<D: SqlDatabase>(
        &self,
        statsdb: Option<&D>,
        statsdb_disk: Option<&D>,
    ) -> CResult<usize> {
        let start_time_micros = time_util::monotonic_time();
        let events = self.buffer.drain();

        self.metrics
            .get_all_events_calls_count
            .fetch_add(1, Ordering::Relaxed);
        if events.is_empty() {
            return Ok(0);
        }

        let after_drain_micros = time_util::monotonic_time();
        self.metrics
            .get_all_events_events_count
            .fetch_add(events.len() as u64, Ordering::Relaxed);
        self.metrics
            .total_get_all_events_disk_copy_time_micros
            .fetch_add(after_drain_micros - start_time_micros, Ordering::Relaxed);

        if let Some(db) = statsdb_disk {
            // 先写落盘库
            let disk_start_micros = time_util::monotonic_time();
            batcher::insert_events_into_db(db, HISTORY_TABLE, &events)?;
            let disk_end_micros = time_util::monotonic_time();
            self.metrics.disk_copy_count.fetch_add(1, Ordering::Relaxed);
            self.metrics
                .total_disk_copy_time_micros
                .fetch_add(disk_end_micros - disk_start_micros, Ordering::Relaxed);
            self.metrics
                .total_events_copied_to_disk
                .fetch_add(events.len() as u64, Ordering::Relaxed);
        }

        if let Some(db) = statsdb {
            let memory_start_micros = time_util::monotonic_time();
            let max_in_memory_size = self.config.table_memory_size();
            let num_events_to_insert = events.len().min(max_in_memory_size);

            if events.len() >= max_in_memory_size {
                db.execute(&format!("DELETE FROM {}", MEMORY_TABLE))?;
            } else {
                // 给新事件腾出位置，按自增 id 删最老的行
                let current_rows =
                    db.return_one_int(&format!("SELECT COUNT(*) FROM {}", MEMORY_TABLE))?;
                let rows_to_keep = (max_in_memory_size - events.len()) as i64;
                if current_rows > rows_to_keep {
                    let rows_to_delete = current_rows - rows_to_keep;
                    db.execute(&format!(
                        "DELETE FROM {} ORDER BY id LIMIT {}",
                        MEMORY_TABLE, rows_to_delete
                    ))?;
                }
            }

            batcher::insert_events_into_db(db, MEMORY_TABLE, &events[..num_events_to_insert])?;
            let memory_end_micros = time_util::monotonic_time();
            self.metrics
                .memory_copy_count
                .fetch_add(1, Ordering::Relaxed);
            self.metrics
                .total_memory_copy_time_micros
                .fetch_add(memory_end_micros - memory_start_micros, Ordering::Relaxed);
            self.metrics
                .total_events_copied_to_memory
                .fetch_add(num_events_to_insert as u64, Ordering::Relaxed);
        }

        Ok(events.len())
    }

    /// 全量指标快照。除 `circularBufferEventsSize` 是当前值外，
    /// 其余都是单调递增计数。
    pub fn all_metrics(&self) -> HashMap<String, u64> {
        let mut all = HashMap::new();
        all.insert(
            "memoryCopyCount".to_string(),
            self.metrics.memory_copy_count.load(Ordering::Relaxed),
        );
        all.insert(
            "diskCopyCount".to_string(),
            self.metrics.disk_copy_count.load(Ordering::Relaxed),
        );
        all.insert(
            "getAllEventsCallsCount".to_string(),
            self.metrics.get_all_events_calls_count.load(Ordering::Relaxed),
        );
        all.insert(
            "getAllEventsEventsCount".to_string(),
            self.metrics.get_all_events_events_count.load(Ordering::Relaxed),
        );
        all.insert(
            "totalMemoryCopyTimeMicros".to_string(),
            self.metrics.total_memory_copy_time_micros.load(Ordering::Relaxed),
        );
        all.insert(
            "totalDiskCopyTimeMicros".to_string(),
            self.metrics.total_disk_copy_time_micros.load(Ordering::Relaxed),
        );
        all.insert(
            "totalGetAllEventsDiskCopyTimeMicros".to_string(),
            self.metrics
                .total_get_all_events_disk_copy_time_micros
                .load(Ordering::Relaxed),
        );
        all.insert(
            "totalEventsCopiedToMemory".to_string(),
            self.metrics.total_events_copied_to_memory.load(Ordering::Relaxed),
        );
        all.insert(
            "totalEventsCopiedToDisk".to_string(),
            self.metrics.total_events_copied_to_disk.load(Ordering::Relaxed),
        );
        all.insert(
            "circularBufferEventsAddedCount".to_string(),
            self.buffer.added_count(),
        );
        all.insert(
            "circularBufferEventsDroppedCount".to_string(),
            self.buffer.dropped_count(),
        );
        all.insert(
            "circularBufferEventsSize".to_string(),
            self.buffer.len() as u64,
        );
        all
    }
}
