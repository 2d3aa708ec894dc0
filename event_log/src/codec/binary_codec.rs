//! 查询类事件的二进制记录（格式 1）。
//!
//! 记录结构: 8 字节小端总长度前缀 + 载荷。前缀不计入总长度。
//! 载荷字段顺序固定，整数一律 length-encoded，字符串带长度前缀。
//! `client_stmt_id` 只在 `StmtPrepare`/`StmtExecute` 记录里出现，
//! `server` 只在 host group 有效时出现。

use byteorder::{LittleEndian, ReadBytesExt};

use common::err::CResult;
use common::err::log_error::LogError;

use crate::codec::length_codec;
use crate::event::event_kind::LogEventKind;
use crate::event::mysql_event::{BufferedEvent, MysqlEvent};
use crate::event::NO_HOSTGROUP_ID;

/// 编码一条查询类记录。
///
/// 总长度在写出任何字节之前算好：对每个整数取 `encoded_len`，
/// 对每个字符串取长度前缀加原始字节数。前缀必须与其后实际写出的
/// 字节数严格相等。
pub fn encode_query_record(event: &MysqlEvent) -> Vec<u8> {
    let username = event.username().as_bytes();
    let schemaname = event.schemaname().as_bytes();
    let client = event.client().as_bytes();
    let query = event.query();
    let hid = *event.hid();

    let mut total: u64 = 1; // kind
    total += length_codec::encoded_len(*event.thread_id() as u64) as u64;
    total += length_codec::encoded_len(username.len() as u64) as u64 + username.len() as u64;
    total += length_codec::encoded_len(schemaname.len() as u64) as u64 + schemaname.len() as u64;
    total += length_codec::encoded_len(client.len() as u64) as u64 + client.len() as u64;
    total += length_codec::encoded_len(hid) as u64;
    if hid != NO_HOSTGROUP_ID {
        if let Some(server) = event.server() {
            total += length_codec::encoded_len(server.len() as u64) as u64 + server.len() as u64;
        }
    }
    total += length_codec::encoded_len(*event.start_time()) as u64;
    total += length_codec::encoded_len(*event.end_time()) as u64;
    if event.kind().is_stmt() {
        total += length_codec::encoded_len(*event.client_stmt_id() as u64) as u64;
    }
    total += length_codec::encoded_len(*event.affected_rows()) as u64;
    // as in MySQL protocol, last_insert_id is immediately after affected_rows
    total += length_codec::encoded_len(*event.last_insert_id()) as u64;
    total += length_codec::encoded_len(*event.rows_sent()) as u64;
    total += length_codec::encoded_len(*event.query_digest()) as u64;
    total += length_codec::encoded_len(query.len() as u64) as u64 + query.len() as u64;

    let mut buf = Vec::with_capacity(8 + total as usize);
    buf.extend_from_slice(&total.to_le_bytes());

    buf.push((*event.kind()).into());
    length_codec::write_encoded(&mut buf, *event.thread_id() as u64);

    length_codec::write_encoded(&mut buf, username.len() as u64);
    buf.extend_from_slice(username);
    length_codec::write_encoded(&mut buf, schemaname.len() as u64);
    buf.extend_from_slice(schemaname);
    length_codec::write_encoded(&mut buf, client.len() as u64);
    buf.extend_from_slice(client);

    length_codec::write_encoded(&mut buf, hid);
    if hid != NO_HOSTGROUP_ID {
        if let Some(server) = event.server() {
            length_codec::write_encoded(&mut buf, server.len() as u64);
            buf.extend_from_slice(server.as_bytes());
        }
    }

    length_codec::write_encoded(&mut buf, *event.start_time());
    length_codec::write_encoded(&mut buf, *event.end_time());

    if event.kind().is_stmt() {
        length_codec::write_encoded(&mut buf, *event.client_stmt_id() as u64);
    }

    length_codec::write_encoded(&mut buf, *event.affected_rows());
    length_codec::write_encoded(&mut buf, *event.last_insert_id());
    length_codec::write_encoded(&mut buf, *event.rows_sent());
    length_codec::write_encoded(&mut buf, *event.query_digest());

    length_codec::write_encoded(&mut buf, query.len() as u64);
    if !query.is_empty() {
        buf.extend_from_slice(query);
    }

    debug_assert_eq!(buf.len() as u64, 8 + total);
    buf
}

/// 解码一条查询类记录，返回（事件，消耗的字节数）。
///
/// 二进制格式总是携带 affected_rows/last_insert_id/rows_sent，
/// 解码结果里对应的 have_* 标志为真。GTID 不进二进制格式。
pub fn decode_query_record(input: &[u8]) -> CResult<(BufferedEvent, usize)> {
    let mut prefix = input
        .get(..8)
        .ok_or_else(|| LogError::Incomplete("short length prefix".to_string()))?;
    let total = prefix.read_u64::<LittleEndian>()? as usize;
    let payload = input
        .get(8..8 + total)
        .ok_or_else(|| LogError::Incomplete("short record payload".to_string()))?;

    let mut pos: usize = 0;
    let kind_byte = *payload
        .first()
        .ok_or_else(|| LogError::Incomplete("empty record payload".to_string()))?;
    pos += 1;
    let kind = LogEventKind::try_from(kind_byte)
        .map_err(|_| LogError::InvalidData(format!("unknown event kind {}", kind_byte)))?;
    if !kind.is_query_family() {
        return Err(LogError::InvalidData(format!(
            "kind {:?} is not a query record",
            kind
        )));
    }

    let thread_id = read_int(payload, &mut pos)?;
    let username = read_string(payload, &mut pos)?;
    let schemaname = read_string(payload, &mut pos)?;
    let client = read_string(payload, &mut pos)?;

    let hid = read_int(payload, &mut pos)?;
    let server = if hid != NO_HOSTGROUP_ID {
        Some(read_string(payload, &mut pos)?)
    } else {
        None
    };

    let start_time = read_int(payload, &mut pos)?;
    let end_time = read_int(payload, &mut pos)?;

    let client_stmt_id = if kind.is_stmt() {
        read_int(payload, &mut pos)? as u32
    } else {
        0
    };

    let affected_rows = read_int(payload, &mut pos)?;
    let last_insert_id = read_int(payload, &mut pos)?;
    let rows_sent = read_int(payload, &mut pos)?;
    let query_digest = read_int(payload, &mut pos)?;

    let query_len = read_int(payload, &mut pos)? as usize;
    let query = payload
        .get(pos..pos + query_len)
        .ok_or_else(|| LogError::Incomplete("short query payload".to_string()))?
        .to_vec();
    pos += query_len;

    if pos != total {
        return Err(LogError::InvalidData(format!(
            "record length mismatch: prefix {} consumed {}",
            total, pos
        )));
    }

    let mut event = MysqlEvent::new(
        kind,
        thread_id as u32,
        username,
        schemaname,
        start_time,
        end_time,
        query_digest,
        client,
    );
    if let Some(server) = server {
        event.set_server(hid, server);
    }
    event.set_query(query);
    event.set_affected_rows(affected_rows, last_insert_id);
    event.set_rows_sent(rows_sent);
    event.set_client_stmt_id(client_stmt_id);

    Ok((event, 8 + total))
}

fn read_int(payload: &[u8], pos: &mut usize) -> CResult<u64> {
    let rest = payload
        .get(*pos..)
        .ok_or_else(|| LogError::Incomplete("record truncated".to_string()))?;
    let (consumed, v) = length_codec::read_encoded(rest)?;
    *pos += consumed;
    Ok(v)
}

fn read_string(payload: &[u8], pos: &mut usize) -> CResult<String> {
    let len = read_int(payload, pos)? as usize;
    let bytes = payload
        .get(*pos..*pos + len)
        .ok_or_else(|| LogError::Incomplete("string truncated".to_string()))?;
    *pos += len;
    Ok(std::str::from_utf8(bytes)?.to_string())
}
