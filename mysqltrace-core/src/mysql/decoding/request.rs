//! Client to server packet decoder.

use bytes::Bytes;
use tracing::trace;

use super::bitmap::{BitmapLayout, NullBitmap};
use super::reader::PacketCursor;
use super::value::read_value;
use super::CorrelatorView;
use crate::error::DecodeError;
use crate::mysql::packet::{payload, sequence};
use crate::mysql::structure::{
    AuthResponse, CapabilityFlags, CommandCode, Event, ExecuteRequest, GenericCommand,
    LoginRequest, ParamType, PrepareRequest, QueryRequest, UnrecognisedCommand, Value,
};

/// Length of the handshake response up to the username (also the whole SSL request).
const LOGIN_HEADER_LEN: usize = 32;
const LOGIN_RESERVED_LEN: usize = 19;

/// Decodes one client packet at a time.
///
/// Stateless: everything that depends on earlier traffic comes from the
/// [`CorrelatorView`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestDecoder;

impl RequestDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode a complete packet, header included.
    pub fn decode(&self, packet: &[u8], view: &dyn CorrelatorView) -> Result<Event, DecodeError> {
        let body = payload(packet);
        if body.is_empty() {
            return Err(DecodeError::EmptyPacket);
        }

        // Plugin data answering an auth switch or auth-more-data packet
        if view.auth_in_progress() {
            return Ok(Event::AuthResponse(AuthResponse {
                data: Bytes::copy_from_slice(body),
            }));
        }

        // The handshake response starts with capability flags, not a command byte
        if sequence(packet) == Some(1)
            && (view.just_saw_greeting() || view.previous_request().is_none())
        {
            return decode_login(body).map(Event::Login);
        }

        let mut cursor = PacketCursor::new(body);
        let code = cursor.read_u8("command")?;
        let Some(command) = CommandCode::from_u8(code) else {
            trace!(code, len = body.len(), "unrecognised command byte");
            return Ok(Event::Unrecognised(UnrecognisedCommand {
                code,
                body: Bytes::copy_from_slice(cursor.rest()),
            }));
        };
        trace!(command = %command, len = body.len(), "decoding request");

        let event = match command {
            CommandCode::Query => Event::Query(QueryRequest {
                query: text(cursor.rest()),
            }),
            CommandCode::StmtPrepare => Event::Prepare(PrepareRequest {
                query: text(cursor.rest()),
            }),
            CommandCode::Quit => Event::Quit,
            CommandCode::StmtExecute => Event::Execute(decode_execute(&mut cursor, view)?),
            other => Event::Command(decode_generic(other, &mut cursor)?),
        };
        Ok(event)
    }
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn decode_login(body: &[u8]) -> Result<LoginRequest, DecodeError> {
    let mut cursor = PacketCursor::new(body);
    let capabilities = CapabilityFlags::from_bits(cursor.read_u32("capabilities")?);
    let max_packet_size = cursor.read_u32("max_packet_size")?;
    let collation = cursor.read_u8("collation")?;
    cursor.skip("reserved", LOGIN_RESERVED_LEN)?;
    let extended_capabilities = cursor.read_u32("extended_capabilities")?;

    // SSL request: the real login follows once TLS is up
    let username = if body.len() == LOGIN_HEADER_LEN {
        String::new()
    } else {
        cursor.read_nul_string("username")?
    };

    Ok(LoginRequest {
        capabilities,
        max_packet_size,
        collation,
        extended_capabilities,
        username,
    })
}

fn decode_execute(
    cursor: &mut PacketCursor<'_>,
    view: &dyn CorrelatorView,
) -> Result<ExecuteRequest, DecodeError> {
    let statement_id = cursor.read_u32("statement_id")?;
    let flags = cursor.read_u8("flags")?;
    let iteration_count = cursor.read_u32("iteration_count")?;

    let mut execute = ExecuteRequest {
        statement_id,
        flags,
        iteration_count,
        null_map: None,
        new_params_bound: false,
        param_types: Vec::new(),
        params: Vec::new(),
    };

    let count = usize::from(view.params_for(statement_id));
    if count == 0 {
        return Ok(execute);
    }

    let null_map = NullBitmap::read(cursor, count, BitmapLayout::ExecuteParams)?;
    execute.new_params_bound = cursor.read_u8("new_params_bound")? == 1;

    if execute.new_params_bound {
        execute.param_types.reserve(count);
        for _ in 0..count {
            let type_code = cursor.read_u8("param_type")?;
            let flag = cursor.read_u8("param_flag")?;
            execute.param_types.push(ParamType::from_wire(type_code, flag));
        }
    }

    let types = if execute.new_params_bound {
        Some(execute.param_types.as_slice())
    } else {
        view.param_types_for(statement_id)
    };

    match types {
        Some(types) if types.len() >= count => {
            let mut params = Vec::with_capacity(count);
            for (index, param) in types.iter().take(count).enumerate() {
                if null_map.is_null(index)? {
                    params.push(Value::Null);
                } else {
                    params.push(read_value(cursor, param.field_type, param.unsigned)?);
                }
            }
            execute.params = params;
        }
        _ => trace!(statement_id, "parameter types unknown, values left undecoded"),
    }

    execute.null_map = Some(null_map);
    Ok(execute)
}

fn decode_generic(
    code: CommandCode,
    cursor: &mut PacketCursor<'_>,
) -> Result<GenericCommand, DecodeError> {
    let mut command = GenericCommand {
        code,
        statement_id: None,
        argument: None,
    };

    match code {
        CommandCode::StmtClose
        | CommandCode::StmtReset
        | CommandCode::StmtFetch
        | CommandCode::StmtSendLongData => {
            command.statement_id = Some(cursor.read_u32("statement_id")?);
        }
        CommandCode::InitDb | CommandCode::CreateDb | CommandCode::DropDb => {
            command.argument = Some(text(cursor.rest()));
        }
        CommandCode::FieldList => {
            let rest = cursor.rest();
            let table = rest.split(|&b| b == 0).next().unwrap_or_default();
            command.argument = Some(text(table));
        }
        CommandCode::ProcessKill => {
            command.argument = Some(cursor.read_u32("connection_id")?.to_string());
        }
        _ => {}
    }

    Ok(command)
}
