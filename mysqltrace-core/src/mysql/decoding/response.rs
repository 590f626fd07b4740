//! Server to client packet decoder.
//!
//! Most responses are a single packet. Result sets and prepare responses span
//! several packets (column count, column definitions, EOF, rows, EOF), so the
//! decoder keeps a small state machine and accumulates them into one event.

use bytes::Bytes;
use tracing::{debug, trace};

use super::bitmap::{BitmapLayout, NullBitmap};
use super::reader::PacketCursor;
use super::value::read_value;
use super::CorrelatorView;
use crate::error::DecodeError;
use crate::mysql::packet::{payload, sequence};
use crate::mysql::structure::{
    AuthMoreData, AuthSwitchRequest, CapabilityFlags, ColumnInfo, EofMarker, ErrorResponse, Event,
    FieldDetail, FieldType, Greeting, LocalInfileRequest, OkResponse, PrepareOkResponse,
    ProgressReport, RequestKind, ResponseType, ResultSetResponse, StatusFlags, TypeInfo, Value,
};

/// Error code used by MariaDB for progress reports.
const PROGRESS_CODE: u16 = 0xffff;
/// An 0xFE packet this long or longer is a length-encoded integer, not EOF.
const EOF_MAX_PAYLOAD: usize = 9;
/// Connection id, first part of the auth data and its filler byte.
const GREETING_SKIP_LEN: usize = 13;
const SQL_STATE_LEN: usize = 5;

/// Where the decoder is within a multi-packet response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseState {
    #[default]
    Start,
    /// Column definitions of a result set.
    FieldInfo,
    /// Column definitions of a prepare response.
    FieldInfoColumns,
    /// Parameter definitions of a prepare response.
    FieldInfoParams,
    /// Result set rows.
    Data,
}

/// Decodes server packets, carrying partial result sets between calls.
#[derive(Debug, Default)]
pub struct ResponseDecoder {
    state: ResponseState,
    columns: Vec<ColumnInfo>,
    rows: Vec<Vec<Value>>,
    prepare: Option<PrepareOkResponse>,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ResponseState {
        self.state
    }

    /// Decode a complete packet, header included.
    ///
    /// Returns `Ok(None)` while a multi-packet response is still being
    /// accumulated. On error the state is left unchanged.
    pub fn decode(
        &mut self,
        packet: &[u8],
        view: &dyn CorrelatorView,
    ) -> Result<Option<Event>, DecodeError> {
        let body = payload(packet);
        let Some(&lead) = body.first() else {
            return Err(DecodeError::EmptyPacket);
        };

        match self.state {
            ResponseState::Start => self.decode_start(packet, body, view),
            _ if lead == ResponseType::ERROR => {
                // The server gave up part way through
                debug!(
                    state = ?self.state,
                    rows = self.rows.len(),
                    "error inside multi-packet response, discarding partial data"
                );
                let event = decode_error(body)?;
                self.reset();
                Ok(Some(event))
            }
            ResponseState::FieldInfo if is_eof(body) => {
                self.state = ResponseState::Data;
                Ok(None)
            }
            ResponseState::FieldInfoParams if is_eof(body) => {
                let columns_pending = self
                    .prepare
                    .as_ref()
                    .is_some_and(|p| p.num_columns > 0);
                if columns_pending {
                    self.state = ResponseState::FieldInfoColumns;
                    Ok(None)
                } else {
                    Ok(self.take_prepare())
                }
            }
            ResponseState::FieldInfoColumns if is_eof(body) => Ok(self.take_prepare()),
            ResponseState::FieldInfo => {
                let column = decode_column(body)?;
                self.columns.push(column);
                Ok(None)
            }
            ResponseState::FieldInfoParams | ResponseState::FieldInfoColumns => {
                let column = decode_column(body)?;
                if let Some(prepare) = self.prepare.as_mut() {
                    if self.state == ResponseState::FieldInfoParams {
                        prepare.params.push(column);
                    } else {
                        prepare.columns.push(column);
                    }
                }
                Ok(None)
            }
            ResponseState::Data if is_eof(body) => Ok(self.take_result_set()),
            ResponseState::Data => {
                let row = if view.previous_request() == Some(RequestKind::Execute) {
                    decode_binary_row(body, &self.columns)?
                } else {
                    decode_text_row(body, self.columns.len())?
                };
                self.rows.push(row);
                Ok(None)
            }
        }
    }

    /// Emit whatever multi-packet response is still being accumulated.
    ///
    /// Called at the end of a connection so truncated captures keep their data.
    pub fn flush(&mut self) -> Option<Event> {
        match self.state {
            ResponseState::Start => None,
            ResponseState::FieldInfo | ResponseState::Data => self.take_result_set(),
            ResponseState::FieldInfoColumns | ResponseState::FieldInfoParams => self.take_prepare(),
        }
    }

    /// Abandon a multi-packet response because the client has started a new
    /// command. Returns the partial result set or prepare response when
    /// anything beyond the header was decoded.
    pub fn interrupt(&mut self) -> Option<Event> {
        let partial = match self.state {
            ResponseState::Start => return None,
            ResponseState::FieldInfoColumns | ResponseState::FieldInfoParams => {
                self.take_prepare()
            }
            ResponseState::FieldInfo | ResponseState::Data if !self.columns.is_empty() => {
                self.take_result_set()
            }
            ResponseState::FieldInfo | ResponseState::Data => None,
        };
        debug!(partial = partial.is_some(), "response interrupted by a new command");
        self.reset();
        partial
    }

    fn reset(&mut self) {
        self.state = ResponseState::Start;
        self.columns.clear();
        self.rows.clear();
        self.prepare = None;
    }

    fn take_result_set(&mut self) -> Option<Event> {
        let event = Event::ResultSet(ResultSetResponse {
            columns: std::mem::take(&mut self.columns),
            rows: std::mem::take(&mut self.rows),
        });
        self.reset();
        Some(event)
    }

    fn take_prepare(&mut self) -> Option<Event> {
        let prepare = self.prepare.take();
        self.reset();
        prepare.map(Event::PrepareOk)
    }

    fn decode_start(
        &mut self,
        packet: &[u8],
        body: &[u8],
        view: &dyn CorrelatorView,
    ) -> Result<Option<Event>, DecodeError> {
        if sequence(packet) == Some(0) && !view.compressed() {
            return decode_greeting(body).map(|g| Some(Event::Greeting(g)));
        }

        // Between the login and its final OK or error nothing starts a result set
        if view.previous_request() == Some(RequestKind::Login) {
            if let Some(event) = decode_auth(body)? {
                return Ok(Some(event));
            }
        }

        let event = match ResponseType::from_u8(body[0]) {
            ResponseType::Error => decode_error(body)?,
            ResponseType::Eof if body.len() < EOF_MAX_PAYLOAD => Event::Eof(decode_eof(body)?),
            ResponseType::Ok if view.previous_request() == Some(RequestKind::Prepare) => {
                let prepare = decode_prepare_ok(body)?;
                trace!(
                    statement_id = prepare.statement_id,
                    params = prepare.num_params,
                    columns = prepare.num_columns,
                    "prepare ok"
                );
                if prepare.num_params > 0 {
                    self.prepare = Some(prepare);
                    self.state = ResponseState::FieldInfoParams;
                    return Ok(None);
                }
                if prepare.num_columns > 0 {
                    self.prepare = Some(prepare);
                    self.state = ResponseState::FieldInfoColumns;
                    return Ok(None);
                }
                Event::PrepareOk(prepare)
            }
            ResponseType::Ok => Event::Ok(decode_ok(body)?),
            ResponseType::LocalInfile => Event::LocalInfile(LocalInfileRequest {
                filename: String::from_utf8_lossy(&body[1..]).into_owned(),
            }),
            ResponseType::Eof | ResponseType::ColumnCount => {
                let mut cursor = PacketCursor::new(body);
                let count = cursor.read_lenenc_int("column_count")?;
                trace!(count, "result set");
                self.reset();
                self.columns.reserve(usize::try_from(count).unwrap_or(0).min(4096));
                self.state = ResponseState::FieldInfo;
                return Ok(None);
            }
        };
        Ok(Some(event))
    }
}

fn is_eof(body: &[u8]) -> bool {
    body.first() == Some(&ResponseType::EOF) && body.len() < EOF_MAX_PAYLOAD
}

/// Authentication exchange packets; `None` for the final OK or error.
fn decode_auth(body: &[u8]) -> Result<Option<Event>, DecodeError> {
    match body[0] {
        ResponseType::OK | ResponseType::ERROR => Ok(None),
        ResponseType::EOF => {
            let mut cursor = PacketCursor::new(&body[1..]);
            // A bare 0xFE asks for the pre-4.1 password hash
            let plugin = if cursor.is_empty() {
                String::new()
            } else {
                cursor.read_nul_string("auth_plugin")?
            };
            let data = cursor.rest();
            let data = data.strip_suffix(&[0]).unwrap_or(data);
            Ok(Some(Event::AuthSwitch(AuthSwitchRequest {
                plugin,
                data: Bytes::copy_from_slice(data),
            })))
        }
        ResponseType::AUTH_MORE_DATA => Ok(Some(Event::AuthMoreData(AuthMoreData {
            data: Bytes::copy_from_slice(&body[1..]),
        }))),
        lead => Err(DecodeError::UnexpectedAuthPacket { lead }),
    }
}

fn decode_greeting(body: &[u8]) -> Result<Greeting, DecodeError> {
    let mut cursor = PacketCursor::new(body);
    let protocol = cursor.read_u8("protocol")?;
    let version = cursor.read_nul_string("server_version")?;

    let mut skipped = PacketCursor::new(cursor.read_bytes("connection_id", GREETING_SKIP_LEN)?);
    let connection_id = skipped.read_u32("connection_id")?;

    let low = cursor.read_u16("capabilities")?;
    let collation = cursor.read_u8("collation")?;
    let status = if cursor.remaining() >= 2 {
        Some(StatusFlags::from_bits(cursor.read_u16("status")?))
    } else {
        None
    };
    let high = if cursor.remaining() >= 2 {
        cursor.read_u16("capabilities_high")?
    } else {
        0
    };

    Ok(Greeting {
        protocol,
        version,
        connection_id,
        capabilities: CapabilityFlags::from_bits(u32::from(high) << 16 | u32::from(low)),
        collation,
        status,
    })
}

fn decode_error(body: &[u8]) -> Result<Event, DecodeError> {
    let mut cursor = PacketCursor::new(&body[1..]);
    let code = cursor.read_u16("error_code")?;

    if code == PROGRESS_CODE {
        let mut progress = ProgressReport::default();
        if !cursor.is_empty() {
            progress.stage = cursor.read_u8("stage")?;
            progress.max_stage = cursor.read_u8("max_stage")?;
            progress.progress = cursor.read_u24("progress")?;
            if !cursor.is_empty() {
                progress.info = cursor.read_lenenc_string("progress_info")?;
            }
        }
        return Ok(Event::Progress(progress));
    }

    let state = if cursor.peek_u8() == Some(b'#') && cursor.remaining() > SQL_STATE_LEN {
        cursor.skip("sql_state_marker", 1)?;
        let state = cursor.read_bytes("sql_state", SQL_STATE_LEN)?;
        Some(String::from_utf8_lossy(state).into_owned())
    } else {
        None
    };

    Ok(Event::Error(ErrorResponse {
        code,
        state,
        message: String::from_utf8_lossy(cursor.rest()).into_owned(),
    }))
}

fn decode_eof(body: &[u8]) -> Result<EofMarker, DecodeError> {
    let mut cursor = PacketCursor::new(&body[1..]);
    let mut eof = EofMarker::default();
    if cursor.remaining() >= 2 {
        eof.warnings = cursor.read_u16("warnings")?;
    }
    if cursor.remaining() >= 2 {
        eof.status = StatusFlags::from_bits(cursor.read_u16("status")?);
    }
    Ok(eof)
}

fn decode_ok(body: &[u8]) -> Result<OkResponse, DecodeError> {
    let mut cursor = PacketCursor::new(&body[1..]);
    let affected_rows = cursor.read_lenenc_int("affected_rows")?;
    let last_insert_id = cursor.read_lenenc_int("last_insert_id")?;
    let mut ok = OkResponse {
        affected_rows,
        last_insert_id,
        status: StatusFlags::default(),
        warnings: 0,
        info: None,
    };
    if cursor.remaining() >= 2 {
        ok.status = StatusFlags::from_bits(cursor.read_u16("status")?);
    }
    if cursor.remaining() >= 2 {
        ok.warnings = cursor.read_u16("warnings")?;
    }

    // Human readable info; session state tracking data is binary and skipped
    let rest = cursor.rest();
    if !rest.is_empty() && rest.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        ok.info = Some(String::from_utf8_lossy(rest).into_owned());
    }
    Ok(ok)
}

fn decode_prepare_ok(body: &[u8]) -> Result<PrepareOkResponse, DecodeError> {
    let mut cursor = PacketCursor::new(&body[1..]);
    let statement_id = cursor.read_u32("statement_id")?;
    let num_columns = cursor.read_u16("num_columns")?;
    let num_params = cursor.read_u16("num_params")?;
    cursor.skip("reserved", 1)?;
    let warnings = if cursor.remaining() >= 2 {
        cursor.read_u16("warnings")?
    } else {
        0
    };

    Ok(PrepareOkResponse {
        statement_id,
        num_columns,
        num_params,
        warnings,
        columns: Vec::with_capacity(usize::from(num_columns)),
        params: Vec::with_capacity(usize::from(num_params)),
    })
}

fn decode_column(body: &[u8]) -> Result<ColumnInfo, DecodeError> {
    let mut cursor = PacketCursor::new(body);
    let catalog = cursor.read_lenenc_string("catalog")?.into();
    let schema = cursor.read_lenenc_string("schema")?.into();
    let table = cursor.read_lenenc_string("table")?.into();
    let table_alias = cursor.read_lenenc_string("table_alias")?.into();
    let column = cursor.read_lenenc_string("column")?.into();
    let column_alias = cursor.read_lenenc_string("column_alias")?.into();

    let type_info = TypeInfo {
        length_marker: cursor.read_u8("length_marker")?,
        charset: cursor.read_u16("charset")?,
        max_size: cursor.read_u32("max_size")?,
        field_type: FieldType::from_u8(cursor.read_u8("field_type")?),
        detail: FieldDetail::from_bits(cursor.read_u16("field_detail")?),
        decimals: cursor.read_u8("decimals")?,
    };

    Ok(ColumnInfo {
        catalog,
        schema,
        table,
        table_alias,
        column,
        column_alias,
        type_info,
    })
}

fn decode_text_row(body: &[u8], columns: usize) -> Result<Vec<Value>, DecodeError> {
    let mut cursor = PacketCursor::new(body);
    let mut row = Vec::with_capacity(columns);
    for _ in 0..columns {
        let value = match cursor.read_lenenc_bytes_nullable("column_value")? {
            Some(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
            None => Value::Null,
        };
        row.push(value);
    }
    Ok(row)
}

fn decode_binary_row(body: &[u8], columns: &[ColumnInfo]) -> Result<Vec<Value>, DecodeError> {
    let mut cursor = PacketCursor::new(body);
    cursor.skip("row_header", 1)?;
    let nulls = NullBitmap::read(&mut cursor, columns.len(), BitmapLayout::ResultRow)?;

    let mut row = Vec::with_capacity(columns.len());
    for (index, column) in columns.iter().enumerate() {
        if nulls.is_null(index)? {
            row.push(Value::Null);
        } else {
            let info = &column.type_info;
            row.push(read_value(&mut cursor, info.field_type, info.is_unsigned())?);
        }
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mysql::decoding::StaticView;
    use crate::mysql::packet::split_packets;

    fn users_response() -> Vec<Vec<u8>> {
        vec![
            vec![0x01, 0x00, 0x00, 0x01, 0x03],
            vec![
                0x28, 0x00, 0x00, 0x02, 0x03, 0x64, 0x65, 0x66, 0x04, 0x64, 0x65, 0x6d, 0x6f, 0x05,
                0x75, 0x73, 0x65, 0x72, 0x73, 0x05, 0x75, 0x73, 0x65, 0x72, 0x73, 0x02, 0x69, 0x64,
                0x02, 0x69, 0x64, 0x0c, 0x3f, 0x00, 0x0b, 0x00, 0x00, 0x00, 0x03, 0x03, 0x42, 0x00,
                0x00, 0x00,
            ],
            vec![
                0x2c, 0x00, 0x00, 0x03, 0x03, 0x64, 0x65, 0x66, 0x04, 0x64, 0x65, 0x6d, 0x6f, 0x05,
                0x75, 0x73, 0x65, 0x72, 0x73, 0x05, 0x75, 0x73, 0x65, 0x72, 0x73, 0x04, 0x6e, 0x61,
                0x6d, 0x65, 0x04, 0x6e, 0x61, 0x6d, 0x65, 0x0c, 0x08, 0x00, 0xff, 0x00, 0x00, 0x00,
                0xfd, 0x00, 0x00, 0x00, 0x00, 0x00,
            ],
            vec![
                0x34, 0x00, 0x00, 0x04, 0x03, 0x64, 0x65, 0x66, 0x04, 0x64, 0x65, 0x6d, 0x6f, 0x05,
                0x75, 0x73, 0x65, 0x72, 0x73, 0x05, 0x75, 0x73, 0x65, 0x72, 0x73, 0x08, 0x75, 0x73,
                0x65, 0x72, 0x6e, 0x61, 0x6d, 0x65, 0x08, 0x75, 0x73, 0x65, 0x72, 0x6e, 0x61, 0x6d,
                0x65, 0x0c, 0x08, 0x00, 0xff, 0x00, 0x00, 0x00, 0xfd, 0x04, 0x40, 0x00, 0x00, 0x00,
            ],
            vec![0x05, 0x00, 0x00, 0x05, 0xfe, 0x00, 0x00, 0x22, 0x00],
            vec![
                0x10, 0x00, 0x00, 0x06, 0x01, 0x31, 0x04, 0x6e, 0x61, 0x6d, 0x65, 0x08, 0x75, 0x73,
                0x65, 0x72, 0x6e, 0x61, 0x6d, 0x65,
            ],
            vec![0x05, 0x00, 0x00, 0x07, 0xfe, 0x00, 0x00, 0x22, 0x00],
        ]
    }

    fn decode_all(packets: &[&[u8]], views: &[StaticView]) -> Vec<Event> {
        let mut decoder = ResponseDecoder::new();
        let mut events = Vec::new();
        for (i, packet) in packets.iter().enumerate() {
            let view = &views[i.min(views.len() - 1)];
            if let Some(event) = decoder.decode(packet, view).unwrap() {
                events.push(event);
            }
        }
        events.extend(decoder.flush());
        events
    }

    // Test 1: Text result set from the users table
    #[test]
    fn test_users_result_set() {
        let packets = users_response();
        let packets: Vec<&[u8]> = packets.iter().map(Vec::as_slice).collect();
        let events = decode_all(&packets, &[StaticView::after(RequestKind::Query)]);

        assert_eq!(events.len(), 1);
        let Event::ResultSet(result) = &events[0] else {
            panic!("expected a result set");
        };
        let names: Vec<&str> = result.columns.iter().map(|c| c.column.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "username"]);

        let id = &result.columns[0];
        assert_eq!(id.catalog, "def");
        assert_eq!(id.schema, "demo");
        assert_eq!(id.table, "users");
        assert_eq!(id.type_info.length_marker, 12);
        assert_eq!(id.type_info.charset, 63);
        assert_eq!(id.type_info.max_size, 11);
        assert_eq!(id.type_info.field_type, FieldType::Long);
        assert_eq!(
            id.type_info.detail,
            FieldDetail::NOT_NULL
                | FieldDetail::PRIMARY_KEY
                | FieldDetail::AUTO_INCREMENT
                | FieldDetail::PART_KEY
        );
        assert_eq!(
            result.columns[2].type_info.detail,
            FieldDetail::UNIQUE_KEY | FieldDetail::PART_KEY
        );
        assert_eq!(result.columns[1].type_info.field_type, FieldType::VarString);

        assert_eq!(
            result.rows,
            vec![vec![
                Value::from("1"),
                Value::from("name"),
                Value::from("username")
            ]]
        );
    }

    // Test 2: Plain OK
    #[test]
    fn test_ok_response() {
        let input = [0x07, 0x00, 0x00, 0x01, 0x00, 0x01, 0x02, 0x02, 0x00, 0x00, 0x00];
        let events = decode_all(&[&input[..]], &[StaticView::after(RequestKind::Query)]);
        assert_eq!(
            events,
            vec![Event::Ok(OkResponse {
                affected_rows: 1,
                last_insert_id: 2,
                status: StatusFlags::AUTOCOMMIT,
                warnings: 0,
                info: None,
            })]
        );
    }

    // Test 3: OK after login carries binary session state, not info
    #[test]
    fn test_ok_response_on_login() {
        let input = [
            0x10, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0x40, 0x00, 0x00, 0x00, 0x07, 0x01,
            0x05, 0x04, 0x64, 0x65, 0x6d, 0x6f,
        ];
        let events = decode_all(&[&input[..]], &[StaticView::after(RequestKind::Login)]);
        let Event::Ok(ok) = &events[0] else {
            panic!("expected OK");
        };
        assert_eq!(ok.status.bits(), 0x4002);
        assert_eq!(ok.info, None);
    }

    // Test 4: Prepare response with three parameters, then the execute OK
    #[test]
    fn test_prepare_ok_then_execute_ok() {
        let input = [
            0x0c, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00,
            0x00, 0x00, 0x17, 0x00, 0x00, 0x02, 0x03, 0x64, 0x65, 0x66, 0x00, 0x00, 0x00, 0x01,
            0x3f, 0x00, 0x0c, 0x3f, 0x00, 0x00, 0x00, 0x00, 0x00, 0xfd, 0x80, 0x00, 0x00, 0x00,
            0x00, 0x17, 0x00, 0x00, 0x03, 0x03, 0x64, 0x65, 0x66, 0x00, 0x00, 0x00, 0x01, 0x3f,
            0x00, 0x0c, 0x3f, 0x00, 0x00, 0x00, 0x00, 0x00, 0xfd, 0x80, 0x00, 0x00, 0x00, 0x00,
            0x17, 0x00, 0x00, 0x04, 0x03, 0x64, 0x65, 0x66, 0x00, 0x00, 0x00, 0x01, 0x3f, 0x00,
            0x0c, 0x3f, 0x00, 0x00, 0x00, 0x00, 0x00, 0xfd, 0x80, 0x00, 0x00, 0x00, 0x00, 0x05,
            0x00, 0x00, 0x05, 0xfe, 0x00, 0x00, 0x03, 0x00, 0x07, 0x00, 0x00, 0x01, 0x00, 0x01,
            0x01, 0x02, 0x00, 0x00, 0x00,
        ];
        let (packets, rest) = split_packets(&input);
        assert!(rest.is_empty());
        assert_eq!(packets.len(), 6);

        let mut views = vec![StaticView::after(RequestKind::Prepare); 5];
        views.push(StaticView::after(RequestKind::Execute));
        let events = decode_all(&packets, &views);

        assert_eq!(events.len(), 2);
        let Event::PrepareOk(prepare) = &events[0] else {
            panic!("expected prepare ok");
        };
        assert_eq!(prepare.statement_id, 1);
        assert_eq!(prepare.num_params, 3);
        assert_eq!(prepare.num_columns, 0);
        assert_eq!(prepare.params.len(), 3);
        assert!(prepare.columns.is_empty());
        for param in &prepare.params {
            assert_eq!(param.catalog, "def");
            assert_eq!(param.column, "?");
            assert_eq!(param.type_info.charset, 63);
            assert_eq!(param.type_info.field_type, FieldType::VarString);
            assert_eq!(param.type_info.detail, FieldDetail::BINARY_COLLATION);
        }

        let Event::Ok(ok) = &events[1] else {
            panic!("expected OK");
        };
        assert_eq!((ok.affected_rows, ok.last_insert_id), (1, 1));
    }

    // Test 5: Greeting with connection id and split capabilities
    #[test]
    fn test_greeting() {
        let mut body = vec![0x0a];
        body.extend_from_slice(b"5.7.33\0");
        body.extend_from_slice(&[0x2a, 0x00, 0x00, 0x00]);
        body.extend_from_slice(&[0x11; 8]);
        body.push(0x00);
        body.extend_from_slice(&[0xff, 0xf7, 0x08, 0x02, 0x00, 0xff, 0x81]);
        body.extend_from_slice(&[0x15; 10]);

        let mut packet = (body.len() as u32).to_le_bytes()[..3].to_vec();
        packet.push(0);
        packet.extend_from_slice(&body);

        let events = decode_all(&[packet.as_slice()], &[StaticView::default()]);
        let Event::Greeting(greeting) = &events[0] else {
            panic!("expected greeting");
        };
        assert_eq!(greeting.protocol, 10);
        assert_eq!(greeting.version, "5.7.33");
        assert_eq!(greeting.connection_id, 42);
        assert_eq!(greeting.collation, 8);
        assert_eq!(greeting.capabilities.bits(), 0x81ff_f7ff);
        assert_eq!(greeting.status, Some(StatusFlags::AUTOCOMMIT));
        assert!(!greeting.capabilities.contains(CapabilityFlags::SSL));
    }

    // Test 6: Error with and without SQL state, and the progress sentinel
    #[test]
    fn test_errors() {
        let mut body = vec![0xff, 0x7a, 0x04, b'#'];
        body.extend_from_slice(b"42S02Table 'demo.nope' doesn't exist");
        let event = decode_error(&body).unwrap();
        assert_eq!(
            event,
            Event::Error(ErrorResponse {
                code: 1146,
                state: Some("42S02".into()),
                message: "Table 'demo.nope' doesn't exist".into(),
            })
        );

        let event = decode_error(&[0xff, 0x15, 0x04, b'n', b'o']).unwrap();
        let Event::Error(error) = event else {
            panic!("expected error");
        };
        assert_eq!(error.state, None);
        assert_eq!(error.message, "no");

        let event = decode_error(&[0xff, 0xff, 0xff, 1, 2, 0x10, 0x27, 0x00, 0x04, b'a', b'l', b't', b'r'])
            .unwrap();
        assert_eq!(
            event,
            Event::Progress(ProgressReport {
                stage: 1,
                max_stage: 2,
                progress: 10000,
                info: "altr".into(),
            })
        );
    }

    // Test 7: Binary rows after an execute
    #[test]
    fn test_binary_rows() {
        let mut long_col = vec![0x03];
        long_col.extend_from_slice(b"def");
        long_col.extend_from_slice(&[0, 0, 0, 1, b'n', 0]);
        long_col.extend_from_slice(&[0x0c, 0x3f, 0x00, 0x0b, 0, 0, 0, 0x03, 0x20, 0x00, 0, 0, 0]);
        let mut text_col = vec![0x03];
        text_col.extend_from_slice(b"def");
        text_col.extend_from_slice(&[0, 0, 0, 1, b's', 0]);
        text_col.extend_from_slice(&[0x0c, 0x08, 0x00, 0xff, 0, 0, 0, 0xfd, 0x00, 0x00, 0, 0, 0]);

        let frame = |seq: u8, body: &[u8]| {
            let mut p = (body.len() as u32).to_le_bytes()[..3].to_vec();
            p.push(seq);
            p.extend_from_slice(body);
            p
        };
        let packets = vec![
            frame(1, &[0x02]),
            frame(2, &long_col),
            frame(3, &text_col),
            frame(4, &[0xfe, 0x00, 0x00, 0x02, 0x00]),
            // Both columns present
            frame(5, &[0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0x02, b'h', b'i']),
            // Second column NULL: bit 3 of the row bitmap
            frame(6, &[0x00, 0x08, 0x07, 0x00, 0x00, 0x00]),
            frame(7, &[0xfe, 0x00, 0x00, 0x02, 0x00]),
        ];
        let packets: Vec<&[u8]> = packets.iter().map(Vec::as_slice).collect();
        let events = decode_all(&packets, &[StaticView::after(RequestKind::Execute)]);

        let Event::ResultSet(result) = &events[0] else {
            panic!("expected result set");
        };
        assert_eq!(
            result.rows,
            vec![
                vec![Value::UInt(u32::MAX as u64), Value::from("hi")],
                vec![Value::UInt(7), Value::Null],
            ]
        );
    }

    // Test 8: Flush emits a truncated result set
    #[test]
    fn test_flush_partial() {
        let packets = users_response();
        let view = StaticView::after(RequestKind::Query);
        let mut decoder = ResponseDecoder::new();
        for packet in &packets[..6] {
            assert!(decoder.decode(packet, &view).unwrap().is_none());
        }
        assert_eq!(decoder.state(), ResponseState::Data);

        let Some(Event::ResultSet(result)) = decoder.flush() else {
            panic!("expected partial result set");
        };
        assert_eq!(result.rows.len(), 1);
        assert_eq!(decoder.state(), ResponseState::Start);
        assert!(decoder.flush().is_none());
    }

    // Test 9: A bad row keeps the state machine where it was
    #[test]
    fn test_bad_row_keeps_state() {
        let packets = users_response();
        let view = StaticView::after(RequestKind::Query);
        let mut decoder = ResponseDecoder::new();
        for packet in &packets[..5] {
            decoder.decode(packet, &view).unwrap();
        }

        // Row claiming a 16 byte value with 2 bytes present
        let bad = [0x03, 0x00, 0x00, 0x06, 0x10, b'a', b'b'];
        assert!(matches!(
            decoder.decode(&bad, &view),
            Err(DecodeError::Underrun { .. })
        ));
        assert_eq!(decoder.state(), ResponseState::Data);

        decoder.decode(&packets[5], &view).unwrap();
        let Some(Event::ResultSet(result)) = decoder.decode(&packets[6], &view).unwrap() else {
            panic!("expected result set");
        };
        assert_eq!(result.rows.len(), 1);
    }

    // Test 10: EOF, local infile and empty packets at the start
    #[test]
    fn test_simple_markers() {
        let view = StaticView::after(RequestKind::Query);
        let mut decoder = ResponseDecoder::new();

        let eof = decoder
            .decode(&[0x05, 0x00, 0x00, 0x03, 0xfe, 0x01, 0x00, 0x02, 0x00], &view)
            .unwrap();
        assert_eq!(
            eof,
            Some(Event::Eof(EofMarker {
                warnings: 1,
                status: StatusFlags::AUTOCOMMIT,
            }))
        );

        let infile = decoder
            .decode(b"\x0a\x00\x00\x01\xfb/tmp/a.csv", &view)
            .unwrap();
        assert_eq!(
            infile,
            Some(Event::LocalInfile(LocalInfileRequest {
                filename: "/tmp/a.csv".into()
            }))
        );

        assert_eq!(
            decoder.decode(&[0x00, 0x00, 0x00, 0x01], &view),
            Err(DecodeError::EmptyPacket)
        );
    }

    // Test 11: Error in the middle of a result set ends it
    #[test]
    fn test_error_mid_result() {
        let packets = users_response();
        let view = StaticView::after(RequestKind::Query);
        let mut decoder = ResponseDecoder::new();
        for packet in &packets[..5] {
            decoder.decode(packet, &view).unwrap();
        }

        let mut error = vec![0x0a, 0x00, 0x00, 0x06, 0xff, 0x25, 0x05];
        error.extend_from_slice(b"stopped");
        let event = decoder.decode(&error, &view).unwrap();
        assert!(matches!(event, Some(Event::Error(ErrorResponse { code: 1317, .. }))));
        assert_eq!(decoder.state(), ResponseState::Start);
    }

    // Test 12: Fast-auth packet after a login is not a result set
    #[test]
    fn test_auth_more_data_after_login() {
        let view = StaticView::after(RequestKind::Login);
        let mut decoder = ResponseDecoder::new();

        let event = decoder.decode(&[0x02, 0x00, 0x00, 0x02, 0x01, 0x03], &view).unwrap();
        assert_eq!(
            event,
            Some(Event::AuthMoreData(AuthMoreData {
                data: Bytes::from_static(&[0x03]),
            }))
        );
        assert_eq!(decoder.state(), ResponseState::Start);

        let ok = [0x07, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00];
        let ok = decoder.decode(&ok, &view).unwrap();
        assert!(matches!(ok, Some(Event::Ok(_))));
    }

    // Test 13: Auth switch names the plugin and carries its scramble
    #[test]
    fn test_auth_switch_after_login() {
        let view = StaticView::after(RequestKind::Login);
        let mut decoder = ResponseDecoder::new();

        let mut body = vec![0xfe];
        body.extend_from_slice(b"mysql_native_password\0");
        body.extend_from_slice(&[0x41; 20]);
        body.push(0x00);
        let mut input = (body.len() as u32).to_le_bytes()[..3].to_vec();
        input.push(2);
        input.extend_from_slice(&body);

        let Some(Event::AuthSwitch(switch)) = decoder.decode(&input, &view).unwrap() else {
            panic!("expected auth switch");
        };
        assert_eq!(switch.plugin, "mysql_native_password");
        assert_eq!(switch.data, Bytes::from(vec![0x41; 20]));

        let bare = decoder.decode(&[0x01, 0x00, 0x00, 0x02, 0xfe], &view).unwrap();
        let Some(Event::AuthSwitch(old)) = bare else {
            panic!("expected bare auth switch");
        };
        assert!(old.plugin.is_empty());
        assert!(old.data.is_empty());

        assert_eq!(
            decoder.decode(&[0x01, 0x00, 0x00, 0x02, 0x05], &view),
            Err(DecodeError::UnexpectedAuthPacket { lead: 0x05 })
        );
        assert_eq!(decoder.state(), ResponseState::Start);
    }

    // Test 14: Interrupting keeps decoded columns and returns to Start
    #[test]
    fn test_interrupt() {
        let packets = users_response();
        let view = StaticView::after(RequestKind::Query);
        let mut decoder = ResponseDecoder::new();
        assert!(decoder.interrupt().is_none());

        // Column count only: nothing worth keeping
        decoder.decode(&packets[0], &view).unwrap();
        assert_eq!(decoder.state(), ResponseState::FieldInfo);
        assert!(decoder.interrupt().is_none());
        assert_eq!(decoder.state(), ResponseState::Start);

        for packet in &packets[..3] {
            decoder.decode(packet, &view).unwrap();
        }
        let Some(Event::ResultSet(partial)) = decoder.interrupt() else {
            panic!("expected partial result set");
        };
        assert_eq!(partial.columns.len(), 2);
        assert!(partial.rows.is_empty());
        assert_eq!(decoder.state(), ResponseState::Start);
        assert!(decoder.flush().is_none());
    }
}
