use std::fs;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::log::tracing_factory::TracingFactory;
use event_log::codec::binary_codec;
use event_log::config::LoggerConfig;
use event_log::event::event_kind::LogEventKind;
use event_log::logger::EventLogger;
use event_log::session::{BackendRef, SessionStatus, SessionType, COM_STMT_PREPARE};

use crate::event_log::sample_session;

fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn logger_with_events(dir: &std::path::Path, format: u32, filesize: u64) -> (Arc<LoggerConfig>, EventLogger) {
    let config = Arc::new(LoggerConfig::default());
    config.events_log_format.store(format, Ordering::Relaxed);
    config.events_log_filesize.store(filesize, Ordering::Relaxed);
    config.set_events_filename("ev");
    config
        .events_log_buffer_history_size
        .store(16, Ordering::Relaxed);

    let logger = EventLogger::new(Arc::clone(&config));
    logger.apply_buffer_history_size();
    logger.events_set_datadir(dir.to_str().unwrap());
    logger.events_set_base_filename();
    (config, logger)
}

fn backend() -> BackendRef {
    BackendRef {
        address: "10.0.0.1".to_string(),
        port: 3306,
        hostgroup_id: 5,
    }
}

#[test]
pub fn test_log_request_binary_end_to_end() {
    TracingFactory::init_log(true);

    let dir = temp_dir("event_log_test_e2e_binary");
    let (_config, logger) = logger_with_events(&dir, 1, 1024 * 1024);

    let sess = sample_session();
    logger.log_request(&sess, Some(&backend())).unwrap();
    logger.flush().unwrap();

    let bytes = fs::read(dir.join("ev.00000001")).unwrap();
    let (decoded, consumed) = binary_codec::decode_query_record(&bytes).unwrap();
    assert_eq!(consumed, bytes.len());
    assert_eq!(*decoded.kind(), LogEventKind::Query);
    assert_eq!(decoded.username(), "u");
    assert_eq!(decoded.schemaname(), "db");
    assert_eq!(decoded.client(), "1.2.3.4:3306");
    assert_eq!(*decoded.hid(), 5);
    assert_eq!(decoded.server().as_deref(), Some("10.0.0.1:3306"));
    assert_eq!(decoded.query(), b"SELECT 1");
    assert_eq!(*decoded.rows_sent(), 3);
    assert_eq!(*decoded.query_digest(), 0xDEADBEEF);
    assert!(decoded.start_time() <= decoded.end_time());

    // 写完 events 流之后还进了一份深拷贝
    assert_eq!(logger.buffer().len(), 1);
    let copies = logger.buffer().drain();
    assert_eq!(copies[0].query(), b"SELECT 1");
    assert_eq!(copies[0].raw_query().last(), Some(&0u8));

    fs::remove_dir_all(&dir).ok();
}

#[test]
pub fn test_log_request_json_end_to_end() {
    TracingFactory::init_log(true);

    let dir = temp_dir("event_log_test_e2e_json");
    let (_config, logger) = logger_with_events(&dir, 2, 1024 * 1024);

    let mut sess = sample_session();
    sess.current_query.have_affected_rows = true;
    sess.current_query.affected_rows = 2;
    sess.gtid_buf = "uuid:1-5".to_string();
    logger.log_request(&sess, Some(&backend())).unwrap();
    logger.flush().unwrap();

    let content = fs::read_to_string(dir.join("ev.00000001")).unwrap();
    let j: serde_json::Value = serde_json::from_str(content.trim_end()).unwrap();
    assert_eq!(j["event"], "COM_QUERY");
    assert_eq!(j["hostgroup_id"], 5);
    assert_eq!(j["server"], "10.0.0.1:3306");
    assert_eq!(j["rows_affected"], 2);
    assert_eq!(j["last_gtid"], "uuid:1-5");
    assert_eq!(j["digest"], "0x00000000DEADBEEF");

    fs::remove_dir_all(&dir).ok();
}

#[test]
pub fn test_stmt_prepare_forced_from_pending_packet() {
    TracingFactory::init_log(true);

    let dir = temp_dir("event_log_test_waiting_prepare");
    let (_config, logger) = logger_with_events(&dir, 1, 1024 * 1024);

    let mut sess = sample_session();
    sess.status = SessionStatus::WaitingClientData;
    sess.pending_pkt = vec![0, 0, 0, 0, COM_STMT_PREPARE];
    sess.current_query.stmt_client_id = 42;
    logger.log_request(&sess, None).unwrap();
    logger.flush().unwrap();

    let bytes = fs::read(dir.join("ev.00000001")).unwrap();
    let (decoded, _) = binary_codec::decode_query_record(&bytes).unwrap();
    assert_eq!(*decoded.kind(), LogEventKind::StmtPrepare);
    assert_eq!(*decoded.client_stmt_id(), 42);

    fs::remove_dir_all(&dir).ok();
}

#[test]
pub fn test_stmt_execute_uses_prepared_statement_info() {
    TracingFactory::init_log(true);

    let dir = temp_dir("event_log_test_stmt_execute");
    let (_config, logger) = logger_with_events(&dir, 1, 1024 * 1024);

    let mut sess = sample_session();
    sess.status = SessionStatus::ProcessingStmtExecute;
    sess.current_query.stmt_client_id = 9;
    sess.current_query.stmt_info = Some(event_log::session::PreparedStmtInfo {
        query: b"SELECT ?".to_vec(),
        digest: 0xCAFE,
    });
    logger.log_request(&sess, None).unwrap();
    logger.flush().unwrap();

    let bytes = fs::read(dir.join("ev.00000001")).unwrap();
    let (decoded, _) = binary_codec::decode_query_record(&bytes).unwrap();
    assert_eq!(*decoded.kind(), LogEventKind::StmtExecute);
    assert_eq!(decoded.query(), b"SELECT ?");
    assert_eq!(*decoded.query_digest(), 0xCAFE);
    assert_eq!(*decoded.client_stmt_id(), 9);

    fs::remove_dir_all(&dir).ok();
}

#[test]
pub fn test_rotation_across_requests() {
    TracingFactory::init_log(true);

    let dir = temp_dir("event_log_test_logger_rotation");
    let (_config, logger) = logger_with_events(&dir, 1, 100);

    let sess = sample_session();
    for _ in 0..3 {
        logger.log_request(&sess, None).unwrap();
    }
    logger.flush().unwrap();

    // 前两条落在 1 号文件，写完第二条越过阈值触发轮转，
    // 第三条落在 2 号文件
    let first = fs::read(dir.join("ev.00000001")).unwrap();
    let (_, consumed) = binary_codec::decode_query_record(&first).unwrap();
    let (_, rest) = binary_codec::decode_query_record(&first[consumed..]).unwrap();
    assert_eq!(consumed + rest, first.len());

    let second = fs::read(dir.join("ev.00000002")).unwrap();
    let (_, consumed) = binary_codec::decode_query_record(&second).unwrap();
    assert_eq!(consumed, second.len());

    fs::remove_dir_all(&dir).ok();
}

#[test]
pub fn test_disabled_logger_is_silent() {
    TracingFactory::init_log(true);

    let dir = temp_dir("event_log_test_disabled");
    let config = Arc::new(LoggerConfig::default());
    let logger = EventLogger::new(Arc::clone(&config));
    logger.events_set_datadir(dir.to_str().unwrap());
    logger.events_set_base_filename();

    let sess = sample_session();
    logger.log_request(&sess, None).unwrap();
    assert_eq!(logger.buffer().added_count(), 0);
    assert!(fs::read_dir(&dir).unwrap().next().is_none());

    fs::remove_dir_all(&dir).ok();
}

#[test]
pub fn test_missing_client_stream_early_returns() {
    TracingFactory::init_log(true);

    let dir = temp_dir("event_log_test_no_client");
    let (_config, logger) = logger_with_events(&dir, 1, 1024 * 1024);

    let mut sess = sample_session();
    sess.client = None;
    logger.log_request(&sess, None).unwrap();
    logger.flush().unwrap();

    assert_eq!(fs::read(dir.join("ev.00000001")).unwrap().len(), 0);
    assert_eq!(logger.buffer().added_count(), 0);

    fs::remove_dir_all(&dir).ok();
}

#[test]
pub fn test_audit_end_to_end() {
    TracingFactory::init_log(true);

    let dir = temp_dir("event_log_test_audit");
    let config = Arc::new(LoggerConfig::default());
    config.set_audit_filename("audit");
    let logger = EventLogger::new(Arc::clone(&config));
    logger.audit_set_datadir(dir.to_str().unwrap());
    logger.audit_set_base_filename();

    let mut sess = sample_session();
    sess.session_type = SessionType::Admin;
    logger
        .log_audit(LogEventKind::MysqlAuthOk, &sess, None, None)
        .unwrap();
    logger.flush().unwrap();

    let content = fs::read_to_string(dir.join("audit.00000001")).unwrap();
    let j: serde_json::Value = serde_json::from_str(content.trim_end()).unwrap();
    assert_eq!(j["event"], "Admin_Connect_OK");
    assert_eq!(j["username"], "u");
    assert_eq!(j["client_addr"], "1.2.3.4:3306");
    assert_eq!(j["ssl"], false);

    // audit 事件不进缓冲
    assert_eq!(logger.buffer().added_count(), 0);

    fs::remove_dir_all(&dir).ok();
}

#[test]
pub fn test_buffering_without_file_sink() {
    TracingFactory::init_log(true);

    // 只开缓冲不开文件：事件仍然被深拷贝入队
    let config = Arc::new(LoggerConfig::default());
    config
        .events_log_buffer_history_size
        .store(4, Ordering::Relaxed);
    let logger = EventLogger::new(Arc::clone(&config));
    logger.apply_buffer_history_size();

    let sess = sample_session();
    logger.log_request(&sess, None).unwrap();
    assert_eq!(logger.buffer().len(), 1);
}

#[test]
pub fn test_all_metrics_keys() {
    let config = Arc::new(LoggerConfig::default());
    let logger = EventLogger::new(config);
    let metrics = logger.all_metrics();

    for key in [
        "memoryCopyCount",
        "diskCopyCount",
        "getAllEventsCallsCount",
        "getAllEventsEventsCount",
        "totalMemoryCopyTimeMicros",
        "totalDiskCopyTimeMicros",
        "totalGetAllEventsDiskCopyTimeMicros",
        "totalEventsCopiedToMemory",
        "totalEventsCopiedToDisk",
        "circularBufferEventsAddedCount",
        "circularBufferEventsDroppedCount",
        "circularBufferEventsSize",
    ] {
        assert!(metrics.contains_key(key), "missing {}", key);
    }
    assert_eq!(metrics.len(), 12);
}
