//! 代理会话的窄视图。
//!
//! logger 只通过这些字段访问会话，真正的会话对象由宿主维护。

/// MySQL 协议里 COM_STMT_PREPARE 的命令字节
pub const COM_STMT_PREPARE: u8 = 0x16;

/// MySQL 报文头长度
pub const MYSQL_HDR_LEN: usize = 4;

/// 会话形态
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SessionType {
    Mysql,
    Admin,
    Stats,
    Sqlite,
}

/// 会话在请求结束时刻的状态机位置
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SessionStatus {
    WaitingClientData,
    ProcessingQuery,
    ProcessingStmtPrepare,
    ProcessingStmtExecute,
}

/// 客户端连接上的主体信息
#[derive(Debug, Clone, Default)]
pub struct ConnUserInfo {
    pub username: String,
    pub schemaname: String,
}

/// 客户端数据流
#[derive(Debug, Clone, Default)]
pub struct ClientStream {
    pub conn: Option<ConnUserInfo>,
    /// 客户端地址，不含端口
    pub addr: String,
    pub port: u16,
    /// 代理侧对外地址，可能未绑定
    pub proxy_addr: Option<String>,
    pub proxy_port: u16,
    pub encrypted: bool,
}

/// 预编译语句信息（执行路径上查询文本与摘要来自这里）
#[derive(Debug, Clone, Default)]
pub struct PreparedStmtInfo {
    pub query: Vec<u8>,
    pub digest: u64,
}

/// 当前请求的上下文
#[derive(Debug, Clone, Default)]
pub struct QueryInfo {
    /// 单调时钟，微秒
    pub start_time: u64,
    /// 单调时钟，微秒
    pub end_time: u64,
    pub query: Vec<u8>,
    pub digest: u64,
    pub have_affected_rows: bool,
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub rows_sent: u64,
    pub stmt_client_id: u32,
    pub stmt_info: Option<PreparedStmtInfo>,
}

/// 会话快照
#[derive(Debug, Clone)]
pub struct MysqlSession {
    pub thread_session_id: u32,
    pub session_type: SessionType,
    pub status: SessionStatus,
    /// 会话创建时刻，单调时钟微秒
    pub start_time: u64,
    /// 所属 worker 线程的当前单调时钟微秒
    pub thread_curtime: u64,
    pub client: Option<ClientStream>,
    pub current_query: QueryInfo,
    /// 空串表示没有 GTID
    pub gtid_buf: String,
    /// 客户端待处理报文（头 + 载荷）
    pub pending_pkt: Vec<u8>,
}

impl MysqlSession {
    /// `host:port`；端口为 0 时只有地址
    pub fn client_addr_string(&self) -> String {
        match &self.client {
            Some(stream) => {
                if !stream.addr.is_empty() && stream.port != 0 {
                    format!("{}:{}", stream.addr, stream.port)
                } else {
                    stream.addr.clone()
                }
            }
            None => String::new(),
        }
    }

    /// 待处理报文载荷的首字节（命令字节）
    pub fn pending_command_byte(&self) -> Option<u8> {
        self.pending_pkt.get(MYSQL_HDR_LEN).copied()
    }
}

/// 请求使用的后端（server 流的窄视图）
#[derive(Debug, Clone)]
pub struct BackendRef {
    pub address: String,
    pub port: u16,
    pub hostgroup_id: u32,
}

impl BackendRef {
    pub fn addr_string(&self) -> String {
        if !self.address.is_empty() && self.port != 0 {
            format!("{}:{}", self.address, self.port)
        } else {
            self.address.clone()
        }
    }
}
