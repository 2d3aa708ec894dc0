use std::borrow::Cow;

use getset::Getters;

use crate::codec::binary_codec;
use crate::codec::json_codec;
use crate::config::EventsLogFormat;
use crate::event::event_kind::LogEventKind;
use crate::event::NO_HOSTGROUP_ID;
use crate::session::MysqlSession;

/// 深拷贝后进入环形缓冲的事件，字节全部自有
pub type BufferedEvent = MysqlEvent<'static>;

/// 一条日志事件。
///
/// 请求线程上就地构建的事件通过 `Cow::Borrowed` 借用会话里的字符串；
/// [`MysqlEvent::to_buffered`] 生成的深拷贝全部 `Cow::Owned`，随事件一起释放。
/// 序列化器不区分两种生命周期。
#[derive(Debug, Clone, Getters)]
pub struct MysqlEvent<'a> {
    #[getset(get = "pub")]
    kind: LogEventKind,

    #[getset(get = "pub")]
    thread_id: u32,

    #[getset(get = "pub")]
    username: Cow<'a, str>,

    #[getset(get = "pub")]
    schemaname: Cow<'a, str>,

    /// 真实时钟，微秒
    #[getset(get = "pub")]
    start_time: u64,

    /// 真实时钟，微秒
    #[getset(get = "pub")]
    end_time: u64,

    #[getset(get = "pub")]
    query_digest: u64,

    /// 客户端地址 `host:port`
    #[getset(get = "pub")]
    client: Cow<'a, str>,

    /// host group id，`NO_HOSTGROUP_ID` 表示没有后端
    #[getset(get = "pub")]
    hid: u64,

    /// 后端地址，只在 hid 有效时存在
    #[getset(get = "pub")]
    server: Option<Cow<'a, str>>,

    /// 仅 audit 事件使用
    #[getset(get = "pub")]
    extra_info: Option<Cow<'a, str>>,

    #[getset(get = "pub")]
    have_affected_rows: bool,

    #[getset(get = "pub")]
    affected_rows: u64,

    #[getset(get = "pub")]
    last_insert_id: u64,

    #[getset(get = "pub")]
    have_rows_sent: bool,

    #[getset(get = "pub")]
    rows_sent: u64,

    #[getset(get = "pub")]
    gtid: Option<Cow<'a, str>>,

    #[getset(get = "pub")]
    client_stmt_id: u32,

    // 查询载荷。缓冲副本会在逻辑长度之外追加一个 NUL 字节
    query: Cow<'a, [u8]>,
    // 查询载荷的逻辑长度
    query_len: usize,
}

impl<'a> MysqlEvent<'a> {
    pub fn new(
        kind: LogEventKind,
        thread_id: u32,
        username: impl Into<Cow<'a, str>>,
        schemaname: impl Into<Cow<'a, str>>,
        start_time: u64,
        end_time: u64,
        query_digest: u64,
        client: impl Into<Cow<'a, str>>,
    ) -> Self {
        Self {
            kind,
            thread_id,
            username: username.into(),
            schemaname: schemaname.into(),
            start_time,
            end_time,
            query_digest,
            client: client.into(),
            hid: NO_HOSTGROUP_ID,
            server: None,
            extra_info: None,
            have_affected_rows: false,
            affected_rows: 0,
            last_insert_id: 0,
            have_rows_sent: false,
            rows_sent: 0,
            gtid: None,
            client_stmt_id: 0,
            query: Cow::Borrowed(&[]),
            query_len: 0,
        }
    }

    pub fn set_query(&mut self, query: impl Into<Cow<'a, [u8]>>) {
        self.query = query.into();
        self.query_len = self.query.len();
    }

    /// last_insert_id 与 affected_rows 来自同一个 OK 包，总是一起设置
    pub fn set_affected_rows(&mut self, affected_rows: u64, last_insert_id: u64) {
        self.have_affected_rows = true;
        self.affected_rows = affected_rows;
        self.last_insert_id = last_insert_id;
    }

    pub fn set_rows_sent(&mut self, rows_sent: u64) {
        self.have_rows_sent = true;
        self.rows_sent = rows_sent;
    }

    /// 空的 GTID 缓冲视为没有 GTID
    pub fn set_gtid(&mut self, gtid_buf: &'a str) {
        if !gtid_buf.is_empty() {
            self.gtid = Some(Cow::Borrowed(gtid_buf));
        }
    }

    pub fn set_server(&mut self, hid: u64, server: impl Into<Cow<'a, str>>) {
        self.hid = hid;
        self.server = Some(server.into());
    }

    pub fn set_extra_info(&mut self, extra_info: impl Into<Cow<'a, str>>) {
        self.extra_info = Some(extra_info.into());
    }

    pub fn set_client_stmt_id(&mut self, client_stmt_id: u32) {
        self.client_stmt_id = client_stmt_id;
    }

    /// 查询载荷（逻辑长度以内的字节）
    pub fn query(&self) -> &[u8] {
        &self.query[..self.query_len]
    }

    /// 存储形态的查询载荷，缓冲副本带结尾 NUL
    pub fn raw_query(&self) -> &[u8] {
        &self.query
    }

    pub fn query_len(&self) -> usize {
        self.query_len
    }

    /// 深拷贝。查询载荷截断到 `max_query_len` 并补一个 NUL 字节，
    /// 供下游 SQL 绑定使用。
    pub fn to_buffered(&self, max_query_len: usize) -> BufferedEvent {
        let query_len = self.query_len.min(max_query_len);
        let mut query = Vec::with_capacity(query_len + 1);
        query.extend_from_slice(&self.query[..query_len]);
        query.push(0);

        MysqlEvent {
            kind: self.kind,
            thread_id: self.thread_id,
            username: Cow::Owned(self.username.clone().into_owned()),
            schemaname: Cow::Owned(self.schemaname.clone().into_owned()),
            start_time: self.start_time,
            end_time: self.end_time,
            query_digest: self.query_digest,
            client: Cow::Owned(self.client.clone().into_owned()),
            hid: self.hid,
            server: self.server.clone().map(|s| Cow::Owned(s.into_owned())),
            extra_info: self.extra_info.clone().map(|s| Cow::Owned(s.into_owned())),
            have_affected_rows: self.have_affected_rows,
            affected_rows: self.affected_rows,
            last_insert_id: self.last_insert_id,
            have_rows_sent: self.have_rows_sent,
            rows_sent: self.rows_sent,
            gtid: self.gtid.clone().map(|s| Cow::Owned(s.into_owned())),
            client_stmt_id: self.client_stmt_id,
            query: Cow::Owned(query),
            query_len,
        }
    }

    /// 按流和格式产出一条完整记录的字节。
    ///
    /// 查询类事件按 `events_log_format` 选择二进制或 JSON；
    /// 认证类事件永远是一行 JSON。
    pub fn render(&self, format: EventsLogFormat, sess: &MysqlSession) -> Vec<u8> {
        if self.kind.is_query_family() {
            match format {
                EventsLogFormat::Binary => binary_codec::encode_query_record(self),
                EventsLogFormat::Json => json_codec::query_record_line(self).into_bytes(),
            }
        } else {
            json_codec::audit_record_line(self, sess).into_bytes()
        }
    }
}
