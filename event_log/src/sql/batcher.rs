//! 环形缓冲到 SQL 表的批量插入。
//!
//! 每个目标表 prepare 两条语句：单行插入和 32 行插入
//! （32 × 17 个位置参数）。整批走 32 行语句，余数走单行语句，
//! 整个插入包在一个 `BEGIN ... COMMIT` 里。

use common::err::CResult;

use crate::codec::json_codec;
use crate::event::mysql_event::BufferedEvent;
use crate::sql::{SqlDatabase, SqlStatement};

/// 内存态查询事件表
pub const MEMORY_TABLE: &str = "stats_mysql_query_events";
/// 落盘历史查询事件表
pub const HISTORY_TABLE: &str = "history_mysql_query_events";

// 32 行贴着底层引擎的参数上限
const BATCH_ROWS: usize = 32;
const NUM_COLS: usize = 17;

const COLUMN_DEFS: &str = "(thread_id, username, schemaname, start_time, end_time, \
    query_digest, query, server, client, event_type, hid, extra_info, affected_rows, \
    last_insert_id, rows_sent, client_stmt_id, gtid)";

/// `(?1, ?2, ...), (?18, ...), ...` 的 VALUES 列表
fn multi_rows_values(rows: usize, cols: usize) -> String {
    let mut values = String::new();
    for row in 0..rows {
        if row > 0 {
            values.push_str(", ");
        }
        values.push('(');
        for col in 0..cols {
            if col > 0 {
                values.push_str(", ");
            }
            values.push_str(&format!("?{}", row * cols + col + 1));
        }
        values.push(')');
    }
    values
}

/// 按列顺序绑定一条事件，`base` 是该行在语句里的参数偏移
fn bind_event<S: SqlStatement>(stmt: &mut S, base: usize, event: &BufferedEvent) -> CResult<()> {
    stmt.bind_int(base + 1, *event.thread_id() as i32)?;
    stmt.bind_text(base + 2, event.username())?;
    stmt.bind_text(base + 3, event.schemaname())?;
    stmt.bind_int64(base + 4, *event.start_time() as i64)?;
    stmt.bind_int64(base + 5, *event.end_time() as i64)?;
    stmt.bind_text(base + 6, &json_codec::digest_hex(*event.query_digest()))?;
    stmt.bind_text(base + 7, &String::from_utf8_lossy(event.query()))?;
    match event.server() {
        Some(server) => stmt.bind_text(base + 8, server)?,
        None => stmt.bind_null(base + 8)?,
    }
    stmt.bind_text(base + 9, event.client())?;
    stmt.bind_int(base + 10, u8::from(*event.kind()) as i32)?;
    stmt.bind_int64(base + 11, *event.hid() as i64)?;
    match event.extra_info() {
        Some(extra_info) => stmt.bind_text(base + 12, extra_info)?,
        None => stmt.bind_null(base + 12)?,
    }
    stmt.bind_int64(base + 13, *event.affected_rows() as i64)?;
    stmt.bind_int64(base + 14, *event.last_insert_id() as i64)?;
    stmt.bind_int64(base + 15, *event.rows_sent() as i64)?;
    stmt.bind_int(base + 16, *event.client_stmt_id() as i32)?;
    match event.gtid() {
        Some(gtid) => stmt.bind_text(base + 17, gtid)?,
        None => stmt.bind_null(base + 17)?,
    }
    Ok(())
}

/// 把 `events` 按序插入 `table`。
///
/// 前 `floor(n/32)*32` 条按 32 行一组绑定，每组 step 一次后
/// clear+reset；余下的走单行语句。
pub fn insert_events_into_db<D: SqlDatabase>(
    db: &D,
    table: &str,
    events: &[Box<BufferedEvent>],
) -> CResult<()> {
    let query1 = format!(
        "INSERT INTO {}{} VALUES {}",
        table,
        COLUMN_DEFS,
        multi_rows_values(1, NUM_COLS)
    );
    let query32 = format!(
        "INSERT INTO {}{} VALUES {}",
        table,
        COLUMN_DEFS,
        multi_rows_values(BATCH_ROWS, NUM_COLS)
    );
    let mut statement1 = db.prepare(&query1)?;
    let mut statement32 = db.prepare(&query32)?;

    db.execute("BEGIN")?;

    let max_bulk_row_idx = events.len() / BATCH_ROWS * BATCH_ROWS;
    for (row_idx, event) in events.iter().enumerate() {
        if row_idx < max_bulk_row_idx {
            let idx = row_idx % BATCH_ROWS;
            bind_event(&mut statement32, idx * NUM_COLS, event)?;
            if idx == BATCH_ROWS - 1 {
                statement32.step()?;
                statement32.clear_bindings()?;
                statement32.reset()?;
            }
        } else {
            bind_event(&mut statement1, 0, event)?;
            statement1.step()?;
            statement1.clear_bindings()?;
            statement1.reset()?;
        }
    }

    db.execute("COMMIT")?;
    Ok(())
}
