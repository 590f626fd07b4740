//! Typed protocol events produced by the request and response decoders.

use bytes::Bytes;
use serde::Serialize;

use super::command::{CommandCode, RequestKind};
use super::flags::{CapabilityFlags, StatusFlags};
use super::types::{ColumnInfo, ParamType};
use super::value::Value;
use crate::mysql::decoding::bitmap::NullBitmap;
use crate::stream::Direction;

/// Server handshake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Greeting {
    pub protocol: u8,
    pub version: String,
    pub connection_id: u32,
    pub capabilities: CapabilityFlags,
    pub collation: u8,
    pub status: Option<StatusFlags>,
}

/// Client handshake response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginRequest {
    pub capabilities: CapabilityFlags,
    pub max_packet_size: u32,
    pub collation: u8,
    pub extended_capabilities: u32,
    /// Empty for the short SSL request packet.
    pub username: String,
}

impl LoginRequest {
    /// Whether the client asked for the compressed protocol.
    pub fn compression(&self) -> bool {
        self.capabilities.contains(CapabilityFlags::COMPRESS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrepareRequest {
    pub query: String,
}

/// COM_STMT_EXECUTE.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecuteRequest {
    pub statement_id: u32,
    pub flags: u8,
    pub iteration_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub null_map: Option<NullBitmap>,
    pub new_params_bound: bool,
    /// Types that were sent with this execute, empty when reusing earlier ones.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub param_types: Vec<ParamType>,
    pub params: Vec<Value>,
}

/// Recognised command without a dedicated decoder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericCommand {
    pub code: CommandCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
}

/// Command byte with no known meaning; the body is kept as is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnrecognisedCommand {
    pub code: u8,
    #[serde(serialize_with = "super::serialize_hex")]
    pub body: Bytes,
}

/// Client authentication data sent after an auth switch or auth-more-data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthResponse {
    #[serde(serialize_with = "super::serialize_hex")]
    pub data: Bytes,
}

/// Server asking the client to authenticate with another plugin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthSwitchRequest {
    pub plugin: String,
    #[serde(serialize_with = "super::serialize_hex")]
    pub data: Bytes,
}

/// Plugin-specific authentication exchange, e.g. `caching_sha2_password` fast auth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthMoreData {
    #[serde(serialize_with = "super::serialize_hex")]
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OkResponse {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status: StatusFlags,
    pub warnings: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub state: Option<String>,
    pub message: String,
}

/// Error packet carrying the 0xFFFF progress sentinel.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProgressReport {
    pub stage: u8,
    pub max_stage: u8,
    /// Thousandths of a percent.
    pub progress: u32,
    pub info: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EofMarker {
    pub warnings: u16,
    pub status: StatusFlags,
}

/// Server asking the client to upload a local file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalInfileRequest {
    pub filename: String,
}

/// Response to COM_STMT_PREPARE.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrepareOkResponse {
    pub statement_id: u32,
    pub num_columns: u16,
    pub num_params: u16,
    pub warnings: u16,
    pub columns: Vec<ColumnInfo>,
    pub params: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSetResponse {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<Value>>,
}

/// A packet that could not be decoded, with enough context to look at it offline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeErrorEvent {
    pub direction: Direction,
    pub message: String,
    pub previous_request: Option<RequestKind>,
    pub just_saw_greeting: bool,
    pub compressed: bool,
    #[serde(serialize_with = "super::serialize_hex")]
    pub packet: Bytes,
}

/// One decoded packet or multi-packet group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Event {
    Greeting(Greeting),
    Login(LoginRequest),
    Query(QueryRequest),
    Prepare(PrepareRequest),
    Execute(ExecuteRequest),
    Quit,
    Command(GenericCommand),
    Unrecognised(UnrecognisedCommand),
    AuthResponse(AuthResponse),
    Ok(OkResponse),
    Error(ErrorResponse),
    Progress(ProgressReport),
    Eof(EofMarker),
    LocalInfile(LocalInfileRequest),
    AuthSwitch(AuthSwitchRequest),
    AuthMoreData(AuthMoreData),
    PrepareOk(PrepareOkResponse),
    ResultSet(ResultSetResponse),
    DecodeError(DecodeErrorEvent),
}

impl Event {
    /// Short tag used as the transmission kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Greeting(_) => "Greeting",
            Event::Login(_) => "Login",
            Event::Query(_) => "Query",
            Event::Prepare(_) => "Prepare",
            Event::Execute(_) => "Execute",
            Event::Quit => "Quit",
            Event::Command(cmd) => cmd.code.name(),
            Event::Unrecognised(_) => "UNRECOGNISED",
            Event::AuthResponse(_) => "AuthResponse",
            Event::Ok(_) => "OK",
            Event::Error(_) => "Error",
            Event::Progress(_) => "Progress",
            Event::Eof(_) => "EOF",
            Event::LocalInfile(_) => "LocalInfile",
            Event::AuthSwitch(_) => "AuthSwitch",
            Event::AuthMoreData(_) => "AuthMoreData",
            Event::PrepareOk(_) => "PrepareOK",
            Event::ResultSet(_) => "ResultSet",
            Event::DecodeError(_) => "DecodeError",
        }
    }

    /// Request kind for client-side events.
    pub fn request_kind(&self) -> Option<RequestKind> {
        match self {
            Event::Login(_) => Some(RequestKind::Login),
            Event::Query(_) => Some(RequestKind::Query),
            Event::Prepare(_) => Some(RequestKind::Prepare),
            Event::Execute(_) => Some(RequestKind::Execute),
            Event::Quit => Some(RequestKind::Quit),
            Event::Command(cmd) => Some(RequestKind::Command(cmd.code)),
            Event::Unrecognised(cmd) => Some(RequestKind::Unrecognised(cmd.code)),
            // Continues the login exchange
            Event::AuthResponse(_) => Some(RequestKind::Login),
            _ => None,
        }
    }

    pub fn is_decode_error(&self) -> bool {
        matches!(self, Event::DecodeError(_))
    }
}
