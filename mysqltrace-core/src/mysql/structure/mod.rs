//! Protocol data model: command codes, column metadata, flag sets, values and events.

mod command;
mod event;
mod flags;
mod types;
mod value;

pub use command::{CommandCode, RequestKind, ResponseType};
pub use event::{
    AuthMoreData, AuthResponse, AuthSwitchRequest, DecodeErrorEvent, EofMarker, ErrorResponse,
    Event, ExecuteRequest, GenericCommand, Greeting, LocalInfileRequest, LoginRequest, OkResponse,
    PrepareOkResponse, PrepareRequest, ProgressReport, QueryRequest, ResultSetResponse,
    UnrecognisedCommand,
};
pub use flags::{CapabilityFlags, FieldDetail, StatusFlags};
pub use types::{ColumnInfo, FieldType, ParamType, TypeInfo};
pub use value::{MysqlDate, MysqlDateTime, MysqlTime, Value};

use serde::Serializer;

/// Serialize raw bytes as a lowercase hex string.
pub(crate) fn serialize_hex<S, T>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: AsRef<[u8]>,
{
    serializer.serialize_str(&hex::encode(bytes.as_ref()))
}

/// Same as [`serialize_hex`] for optional bytes.
pub(crate) fn serialize_opt_hex<S, T>(bytes: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: AsRef<[u8]>,
{
    match bytes {
        Some(b) => serialize_hex(b, serializer),
        None => serializer.serialize_none(),
    }
}
