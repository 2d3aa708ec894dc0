use event_log::codec::binary_codec;
use event_log::event::event_kind::LogEventKind;
use event_log::event::mysql_event::MysqlEvent;
use event_log::event::NO_HOSTGROUP_ID;

fn query_event<'a>() -> MysqlEvent<'a> {
    let mut event = MysqlEvent::new(
        LogEventKind::Query,
        7,
        "u",
        "db",
        1000,
        2000,
        0xDEADBEEF,
        "1.2.3.4:3306",
    );
    event.set_query(&b"SELECT 1"[..]);
    event.set_rows_sent(3);
    event
}

#[test]
pub fn test_prefix_equals_payload_len() {
    let event = query_event();
    let buf = binary_codec::encode_query_record(&event);

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&buf[..8]);
    let total = u64::from_le_bytes(prefix);
    assert_eq!(total as usize, buf.len() - 8);

    // kind + thread + "u" + "db" + client(12) + sentinel hid + start + end
    // + affected + last_insert + rows_sent + digest + "SELECT 1"
    let expected = 1 + 1 + (1 + 1) + (1 + 2) + (1 + 12) + 9 + 3 + 3 + 1 + 1 + 1 + 9 + (1 + 8);
    assert_eq!(total, expected as u64);
}

#[test]
pub fn test_round_trip() {
    let mut event = query_event();
    event.set_server(5, "10.0.0.1:3306");
    event.set_affected_rows(2, 9);

    let buf = binary_codec::encode_query_record(&event);
    let (decoded, consumed) = binary_codec::decode_query_record(&buf).unwrap();

    assert_eq!(consumed, buf.len());
    assert_eq!(decoded.kind(), event.kind());
    assert_eq!(decoded.thread_id(), event.thread_id());
    assert_eq!(decoded.username(), event.username());
    assert_eq!(decoded.schemaname(), event.schemaname());
    assert_eq!(decoded.client(), event.client());
    assert_eq!(decoded.hid(), event.hid());
    assert_eq!(decoded.server(), event.server());
    assert_eq!(decoded.start_time(), event.start_time());
    assert_eq!(decoded.end_time(), event.end_time());
    assert_eq!(decoded.affected_rows(), event.affected_rows());
    assert_eq!(decoded.last_insert_id(), event.last_insert_id());
    assert_eq!(decoded.rows_sent(), event.rows_sent());
    assert_eq!(decoded.query_digest(), event.query_digest());
    assert_eq!(decoded.query(), event.query());
}

#[test]
pub fn test_no_server_when_hostgroup_absent() {
    let event = query_event();
    assert_eq!(*event.hid(), NO_HOSTGROUP_ID);

    let buf = binary_codec::encode_query_record(&event);
    let (decoded, _) = binary_codec::decode_query_record(&buf).unwrap();
    assert_eq!(*decoded.server(), None);
}

#[test]
pub fn test_client_stmt_id_gating() {
    let mut prepare = query_event();
    prepare.set_client_stmt_id(42);
    let plain_len = binary_codec::encode_query_record(&prepare).len();

    // 同样的字段换成 StmtPrepare，记录里应多出一个编码后的 stmt id
    let mut event = MysqlEvent::new(
        LogEventKind::StmtPrepare,
        7,
        "u",
        "db",
        1000,
        2000,
        0xDEADBEEF,
        "1.2.3.4:3306",
    );
    event.set_query(&b"SELECT 1"[..]);
    event.set_rows_sent(3);
    event.set_client_stmt_id(42);
    let buf = binary_codec::encode_query_record(&event);
    assert_eq!(buf.len(), plain_len + 1);

    let (decoded, _) = binary_codec::decode_query_record(&buf).unwrap();
    assert_eq!(*decoded.kind(), LogEventKind::StmtPrepare);
    assert_eq!(*decoded.client_stmt_id(), 42);
}

#[test]
pub fn test_empty_query_omits_bytes() {
    let mut event = query_event();
    event.set_query(&b""[..]);
    let buf = binary_codec::encode_query_record(&event);
    let (decoded, consumed) = binary_codec::decode_query_record(&buf).unwrap();
    assert_eq!(consumed, buf.len());
    assert_eq!(decoded.query(), b"");
}

#[test]
pub fn test_decode_rejects_truncated_record() {
    let event = query_event();
    let buf = binary_codec::encode_query_record(&event);
    assert!(binary_codec::decode_query_record(&buf[..buf.len() - 1]).is_err());
    assert!(binary_codec::decode_query_record(&buf[..4]).is_err());
}

#[test]
pub fn test_concatenated_records() {
    let first = query_event();
    let mut second = query_event();
    second.set_server(3, "10.0.0.2:3306");

    let mut buf = binary_codec::encode_query_record(&first);
    buf.extend_from_slice(&binary_codec::encode_query_record(&second));

    let (_, consumed) = binary_codec::decode_query_record(&buf).unwrap();
    let (decoded, rest) = binary_codec::decode_query_record(&buf[consumed..]).unwrap();
    assert_eq!(consumed + rest, buf.len());
    assert_eq!(*decoded.hid(), 3);
}
