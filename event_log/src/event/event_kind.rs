use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;

use crate::session::SessionType;

/// 日志事件类型。
///
/// 查询类事件（`Query`/`StmtExecute`/`StmtPrepare`）走 events 流，
/// 认证类事件走 audit 流。认证类按会话形态分为三个 flavor。
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum LogEventKind {
    Query = 0,

    StmtExecute = 1,

    StmtPrepare = 2,

    MysqlAuthOk = 3,

    MysqlAuthErr = 4,

    MysqlAuthClose = 5,

    MysqlAuthQuit = 6,

    MysqlInitDb = 7,

    AdminAuthOk = 8,

    AdminAuthErr = 9,

    AdminAuthClose = 10,

    AdminAuthQuit = 11,

    SqliteAuthOk = 12,

    SqliteAuthErr = 13,

    SqliteAuthClose = 14,

    SqliteAuthQuit = 15,
}

impl LogEventKind {
    pub fn is_query_family(&self) -> bool {
        matches!(
            self,
            LogEventKind::Query | LogEventKind::StmtExecute | LogEventKind::StmtPrepare
        )
    }

    pub fn is_auth_family(&self) -> bool {
        !self.is_query_family()
    }

    /// 带 client_stmt_id 的事件类型
    pub fn is_stmt(&self) -> bool {
        matches!(self, LogEventKind::StmtPrepare | LogEventKind::StmtExecute)
    }

    pub fn is_close(&self) -> bool {
        matches!(
            self,
            LogEventKind::MysqlAuthClose | LogEventKind::AdminAuthClose | LogEventKind::SqliteAuthClose
        )
    }

    /// `event` value of a query record in JSON format
    pub fn query_label(&self) -> &'static str {
        match self {
            LogEventKind::StmtExecute => "COM_STMT_EXECUTE",
            LogEventKind::StmtPrepare => "COM_STMT_PREPARE",
            _ => "COM_QUERY",
        }
    }

    /// `event` value of an audit record
    pub fn audit_label(&self) -> &'static str {
        match self {
            LogEventKind::MysqlAuthOk => "MySQL_Client_Connect_OK",
            LogEventKind::MysqlAuthErr => "MySQL_Client_Connect_ERR",
            LogEventKind::MysqlAuthClose => "MySQL_Client_Close",
            LogEventKind::MysqlAuthQuit => "MySQL_Client_Quit",
            LogEventKind::MysqlInitDb => "MySQL_Client_Init_DB",
            LogEventKind::AdminAuthOk => "Admin_Connect_OK",
            LogEventKind::AdminAuthErr => "Admin_Connect_ERR",
            LogEventKind::AdminAuthClose => "Admin_Close",
            LogEventKind::AdminAuthQuit => "Admin_Quit",
            LogEventKind::SqliteAuthOk => "SQLite3_Connect_OK",
            LogEventKind::SqliteAuthErr => "SQLite3_Connect_ERR",
            LogEventKind::SqliteAuthClose => "SQLite3_Close",
            LogEventKind::SqliteAuthQuit => "SQLite3_Quit",
            _ => "",
        }
    }

    /// 按会话形态把通用认证事件映射为 flavor 专属事件。
    ///
    /// Admin 与 Stats 会话都映射到 Admin flavor；其余非 SQLite 会话
    /// 保持 MySQL flavor。`MysqlInitDb` 没有 flavor 变体，原样返回。
    pub fn map_for_session(self, session_type: SessionType) -> LogEventKind {
        match self {
            LogEventKind::MysqlAuthOk => match session_type {
                SessionType::Admin | SessionType::Stats => LogEventKind::AdminAuthOk,
                SessionType::Sqlite => LogEventKind::SqliteAuthOk,
                _ => self,
            },
            LogEventKind::MysqlAuthErr => match session_type {
                SessionType::Admin | SessionType::Stats => LogEventKind::AdminAuthErr,
                SessionType::Sqlite => LogEventKind::SqliteAuthErr,
                _ => self,
            },
            LogEventKind::MysqlAuthQuit => match session_type {
                SessionType::Admin | SessionType::Stats => LogEventKind::AdminAuthQuit,
                SessionType::Sqlite => LogEventKind::SqliteAuthQuit,
                _ => self,
            },
            LogEventKind::MysqlAuthClose => match session_type {
                SessionType::Admin | SessionType::Stats => LogEventKind::AdminAuthClose,
                SessionType::Sqlite => LogEventKind::SqliteAuthClose,
                _ => self,
            },
            _ => self,
        }
    }
}
