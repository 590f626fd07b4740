//! Command codes and response leading bytes.

use std::fmt;

use serde::{Serialize, Serializer};

/// Client command byte (first payload byte of every command packet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandCode {
    Sleep = 0x00,
    Quit = 0x01,
    InitDb = 0x02,
    Query = 0x03,
    FieldList = 0x04,
    CreateDb = 0x05,
    DropDb = 0x06,
    Refresh = 0x07,
    Shutdown = 0x08,
    Statistics = 0x09,
    ProcessInfo = 0x0a,
    Connect = 0x0b,
    ProcessKill = 0x0c,
    Debug = 0x0d,
    Ping = 0x0e,
    Time = 0x0f,
    DelayedInsert = 0x10,
    ChangeUser = 0x11,
    BinlogDump = 0x12,
    TableDump = 0x13,
    ConnectOut = 0x14,
    RegisterSlave = 0x15,
    StmtPrepare = 0x16,
    StmtExecute = 0x17,
    StmtSendLongData = 0x18,
    StmtClose = 0x19,
    StmtReset = 0x1a,
    SetOption = 0x1b,
    StmtFetch = 0x1c,
    Daemon = 0x1d,
    BinlogDumpGtid = 0x1e,
    ResetConnection = 0x1f,
}

impl CommandCode {
    pub fn from_u8(code: u8) -> Option<Self> {
        use CommandCode::*;
        Some(match code {
            0x00 => Sleep,
            0x01 => Quit,
            0x02 => InitDb,
            0x03 => Query,
            0x04 => FieldList,
            0x05 => CreateDb,
            0x06 => DropDb,
            0x07 => Refresh,
            0x08 => Shutdown,
            0x09 => Statistics,
            0x0a => ProcessInfo,
            0x0b => Connect,
            0x0c => ProcessKill,
            0x0d => Debug,
            0x0e => Ping,
            0x0f => Time,
            0x10 => DelayedInsert,
            0x11 => ChangeUser,
            0x12 => BinlogDump,
            0x13 => TableDump,
            0x14 => ConnectOut,
            0x15 => RegisterSlave,
            0x16 => StmtPrepare,
            0x17 => StmtExecute,
            0x18 => StmtSendLongData,
            0x19 => StmtClose,
            0x1a => StmtReset,
            0x1b => SetOption,
            0x1c => StmtFetch,
            0x1d => Daemon,
            0x1e => BinlogDumpGtid,
            0x1f => ResetConnection,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            CommandCode::Sleep => "MYSQL_SLEEP",
            CommandCode::Quit => "MYSQL_QUIT",
            CommandCode::InitDb => "MYSQL_INIT_DB",
            CommandCode::Query => "MYSQL_QUERY",
            CommandCode::FieldList => "MYSQL_FIELD_LIST",
            CommandCode::CreateDb => "MYSQL_CREATE_DB",
            CommandCode::DropDb => "MYSQL_DROP_DB",
            CommandCode::Refresh => "MYSQL_REFRESH",
            CommandCode::Shutdown => "MYSQL_SHUTDOWN",
            CommandCode::Statistics => "MYSQL_STATISTICS",
            CommandCode::ProcessInfo => "MYSQL_PROCESS_INFO",
            CommandCode::Connect => "MYSQL_CONNECT",
            CommandCode::ProcessKill => "MYSQL_PROCESS_KILL",
            CommandCode::Debug => "MYSQL_DEBUG",
            CommandCode::Ping => "MYSQL_PING",
            CommandCode::Time => "MYSQL_TIME",
            CommandCode::DelayedInsert => "MYSQL_DELAYED_INSERT",
            CommandCode::ChangeUser => "MYSQL_CHANGE_USER",
            CommandCode::BinlogDump => "MYSQL_BINLOG_DUMP",
            CommandCode::TableDump => "MYSQL_TABLE_DUMP",
            CommandCode::ConnectOut => "MYSQL_CONNECT_OUT",
            CommandCode::RegisterSlave => "MYSQL_REGISTER_SLAVE",
            CommandCode::StmtPrepare => "MYSQL_STMT_PREPARE",
            CommandCode::StmtExecute => "MYSQL_STMT_EXECUTE",
            CommandCode::StmtSendLongData => "MYSQL_STMT_SEND_LONG_DATA",
            CommandCode::StmtClose => "MYSQL_STMT_CLOSE",
            CommandCode::StmtReset => "MYSQL_STMT_RESET",
            CommandCode::SetOption => "MYSQL_SET_OPTION",
            CommandCode::StmtFetch => "MYSQL_STMT_FETCH",
            CommandCode::Daemon => "MYSQL_DAEMON",
            CommandCode::BinlogDumpGtid => "MYSQL_BINLOG_DUMP_GTID",
            CommandCode::ResetConnection => "MYSQL_RESET_CONNECTION",
        }
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for CommandCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Kind of the most recent client request, as seen by the response side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Login,
    Query,
    Prepare,
    Execute,
    Quit,
    Command(CommandCode),
    /// Leading byte that is not a known command code.
    Unrecognised(u8),
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Login => "Login",
            RequestKind::Query => "Query",
            RequestKind::Prepare => "Prepare",
            RequestKind::Execute => "Execute",
            RequestKind::Quit => "Quit",
            RequestKind::Command(code) => code.name(),
            RequestKind::Unrecognised(_) => "UNRECOGNISED",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RequestKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Response classification by leading payload byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Ok,
    Error,
    Eof,
    LocalInfile,
    ColumnCount,
}

impl ResponseType {
    pub const OK: u8 = 0x00;
    /// Only meaningful while authenticating.
    pub const AUTH_MORE_DATA: u8 = 0x01;
    pub const LOCAL_INFILE: u8 = 0xfb;
    pub const EOF: u8 = 0xfe;
    pub const ERROR: u8 = 0xff;

    pub fn from_u8(byte: u8) -> Self {
        match byte {
            Self::OK => ResponseType::Ok,
            Self::LOCAL_INFILE => ResponseType::LocalInfile,
            Self::EOF => ResponseType::Eof,
            Self::ERROR => ResponseType::Error,
            _ => ResponseType::ColumnCount,
        }
    }
}
