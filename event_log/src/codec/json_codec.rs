//! 查询类事件的 JSON 记录（格式 2）与 audit 记录。
//!
//! 每条记录一行紧凑 JSON，换行结尾。非法 UTF-8 统一按替换策略
//! 转义，绝不拒绝记录。

use serde_json::{json, Map, Value};

use common::time_util;

use crate::event::mysql_event::MysqlEvent;
use crate::event::NO_HOSTGROUP_ID;
use crate::session::MysqlSession;

/// 一条查询类记录的 JSON 行
pub fn query_record_line(event: &MysqlEvent) -> String {
    let mut j = Map::new();

    if *event.hid() != NO_HOSTGROUP_ID {
        j.insert("hostgroup_id".to_string(), json!(*event.hid()));
    } else {
        j.insert("hostgroup_id".to_string(), json!(-1));
    }
    j.insert("thread_id".to_string(), json!(*event.thread_id()));
    j.insert("event".to_string(), json!(event.kind().query_label()));

    j.insert("username".to_string(), json!(event.username()));
    j.insert("schemaname".to_string(), json!(event.schemaname()));
    j.insert("client".to_string(), json!(event.client()));

    if *event.hid() != NO_HOSTGROUP_ID {
        if let Some(server) = event.server() {
            j.insert("server".to_string(), json!(server));
        }
    }

    // rows_affected 有标志就记，为 0 也记；last_insert_id 为 0 不记
    if *event.have_affected_rows() {
        j.insert("rows_affected".to_string(), json!(*event.affected_rows()));
        if *event.last_insert_id() != 0 {
            j.insert("last_insert_id".to_string(), json!(*event.last_insert_id()));
        }
    }
    if *event.have_rows_sent() {
        j.insert("rows_sent".to_string(), json!(*event.rows_sent()));
    }
    if let Some(gtid) = event.gtid() {
        j.insert("last_gtid".to_string(), json!(gtid));
    }

    j.insert(
        "query".to_string(),
        json!(String::from_utf8_lossy(event.query())),
    );

    j.insert("starttime_timestamp_us".to_string(), json!(*event.start_time()));
    j.insert("starttime".to_string(), json!(format_local_us(*event.start_time())));
    j.insert("endtime_timestamp_us".to_string(), json!(*event.end_time()));
    j.insert("endtime".to_string(), json!(format_local_us(*event.end_time())));
    j.insert(
        "duration_us".to_string(),
        json!(*event.end_time() - *event.start_time()),
    );
    j.insert("digest".to_string(), json!(digest_hex(*event.query_digest())));

    if event.kind().is_stmt() {
        j.insert("client_stmt_id".to_string(), json!(*event.client_stmt_id()));
    }

    let mut line = Value::Object(j).to_string();
    line.push('\n');
    line
}

/// 一条 audit 记录的 JSON 行
pub fn audit_record_line(event: &MysqlEvent, sess: &MysqlSession) -> String {
    let mut j = Map::new();

    j.insert("timestamp".to_string(), json!(*event.start_time() / 1000));
    j.insert("time".to_string(), json!(format_local_ms(*event.start_time())));
    j.insert("thread_id".to_string(), json!(*event.thread_id()));
    j.insert("username".to_string(), json!(event.username()));
    j.insert("schemaname".to_string(), json!(event.schemaname()));
    j.insert("client_addr".to_string(), json!(event.client()));
    if let Some(server) = event.server() {
        j.insert("server_addr".to_string(), json!(server));
    }
    if let Some(extra_info) = event.extra_info() {
        j.insert("extra_info".to_string(), json!(extra_info));
    }
    j.insert("event".to_string(), json!(event.kind().audit_label()));

    if event.kind().is_close() {
        // 会话创建时刻 = 真实时钟当前值 - 会话在单调时钟上的存活时长
        let curtime_real = time_util::realtime_time();
        let curtime_mono = sess.thread_curtime;
        let timediff = curtime_mono.saturating_sub(sess.start_time);
        let orig_time = curtime_real.saturating_sub(timediff);
        j.insert("creation_time".to_string(), json!(format_local_ms(orig_time)));
        j.insert(
            "duration".to_string(),
            json!(format!("{:.3}ms", timediff as f64 / 1000.0)),
        );
    }

    if let Some(client) = &sess.client {
        if let Some(proxy_addr) = &client.proxy_addr {
            j.insert(
                "proxy_addr".to_string(),
                json!(format!("{}:{}", proxy_addr, client.proxy_port)),
            );
        }
        j.insert("ssl".to_string(), json!(client.encrypted));
    }

    let mut line = Value::Object(j).to_string();
    line.push('\n');
    line
}

/// `0x` + 16 位大写十六进制
pub fn digest_hex(digest: u64) -> String {
    format!("0x{:016X}", digest)
}

/// 本地时间，微秒精度：`YYYY-MM-DD HH:MM:SS.uuuuuu`
pub fn format_local_us(us: u64) -> String {
    format!("{}.{:06}", format_local_secs(us), us % 1_000_000)
}

/// 本地时间，毫秒精度：`YYYY-MM-DD HH:MM:SS.mmm`
pub fn format_local_ms(us: u64) -> String {
    format!("{}.{:03}", format_local_secs(us), (us % 1_000_000) / 1000)
}

fn format_local_secs(us: u64) -> String {
    use chrono::{DateTime, Local};

    let dt = DateTime::from_timestamp((us / 1_000_000) as i64, 0)
        .unwrap_or_default()
        .with_timezone(&Local);
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}
