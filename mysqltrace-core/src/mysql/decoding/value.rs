//! Binary-protocol value reader.
//!
//! Used for COM_STMT_EXECUTE parameters and binary result rows.

use super::reader::PacketCursor;
use crate::error::DecodeError;
use crate::mysql::structure::{FieldType, MysqlDate, MysqlDateTime, MysqlTime, Value};

/// Read one non-NULL value of `field_type`.
pub fn read_value(
    cursor: &mut PacketCursor<'_>,
    field_type: FieldType,
    unsigned: bool,
) -> Result<Value, DecodeError> {
    let value = match field_type {
        FieldType::Null => Value::Null,
        FieldType::Float => Value::Float(cursor.read_f32("float")?),
        FieldType::Double => Value::Double(cursor.read_f64("double")?),
        FieldType::LongLong => {
            let raw = cursor.read_u64("longlong")?;
            integer(raw, raw as i64, unsigned)
        }
        FieldType::Long | FieldType::Int24 => {
            let raw = cursor.read_u32("long")?;
            integer(raw.into(), i64::from(raw as i32), unsigned)
        }
        FieldType::Short | FieldType::Year => {
            let raw = cursor.read_u16("short")?;
            integer(raw.into(), i64::from(raw as i16), unsigned)
        }
        FieldType::Tiny => {
            let raw = cursor.read_u8("tiny")?;
            integer(raw.into(), i64::from(raw as i8), unsigned)
        }
        FieldType::Date | FieldType::NewDate => Value::Date(read_datetime(cursor, field_type)?.date),
        FieldType::DateTime
        | FieldType::DateTime2
        | FieldType::Timestamp
        | FieldType::Timestamp2 => Value::DateTime(read_datetime(cursor, field_type)?),
        FieldType::Time | FieldType::Time2 => Value::Time(read_time(cursor, field_type)?),
        FieldType::String | FieldType::VarString | FieldType::VarChar => {
            Value::String(cursor.read_lenenc_string("string")?)
        }
        _ => Value::from_untyped(cursor.read_lenenc_bytes("value")?),
    };
    Ok(value)
}

fn integer(raw: u64, signed: i64, unsigned: bool) -> Value {
    if unsigned {
        Value::UInt(raw)
    } else {
        Value::Int(signed)
    }
}

fn read_datetime(
    cursor: &mut PacketCursor<'_>,
    field_type: FieldType,
) -> Result<MysqlDateTime, DecodeError> {
    let length = cursor.read_u8("datetime length")?;
    let mut dt = MysqlDateTime::default();
    match length {
        0 => return Ok(dt),
        4 | 7 | 11 => {}
        _ => {
            return Err(DecodeError::InvalidTemporalLength {
                field_type: field_type.name(),
                length,
            })
        }
    }

    dt.date = MysqlDate {
        year: cursor.read_u16("year")?,
        month: cursor.read_u8("month")?,
        day: cursor.read_u8("day")?,
    };
    if length >= 7 {
        dt.hour = cursor.read_u8("hour")?;
        dt.minute = cursor.read_u8("minute")?;
        dt.second = cursor.read_u8("second")?;
    }
    if length == 11 {
        dt.micros = cursor.read_u32("microseconds")?;
    }
    Ok(dt)
}

fn read_time(cursor: &mut PacketCursor<'_>, field_type: FieldType) -> Result<MysqlTime, DecodeError> {
    let length = cursor.read_u8("time length")?;
    let mut time = MysqlTime::default();
    match length {
        0 => return Ok(time),
        8 | 12 => {}
        _ => {
            return Err(DecodeError::InvalidTemporalLength {
                field_type: field_type.name(),
                length,
            })
        }
    }

    time.negative = cursor.read_u8("negative")? == 1;
    time.days = cursor.read_u32("days")?;
    time.hour = cursor.read_u8("hour")?;
    time.minute = cursor.read_u8("minute")?;
    time.second = cursor.read_u8("second")?;
    if length == 12 {
        time.micros = cursor.read_u32("microseconds")?;
    }
    Ok(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(data: &[u8], field_type: FieldType, unsigned: bool) -> Result<Value, DecodeError> {
        let mut cursor = PacketCursor::new(data);
        let value = read_value(&mut cursor, field_type, unsigned)?;
        assert!(cursor.is_empty(), "{field_type} left {} bytes", cursor.remaining());
        Ok(value)
    }

    // Test 1: Integer widths, signed and unsigned
    #[test]
    fn test_integers() {
        assert_eq!(read(&[33, 0, 0, 0, 0, 0, 0, 0], FieldType::LongLong, false), Ok(Value::Int(33)));
        assert_eq!(read(&[0xff; 4], FieldType::Long, false), Ok(Value::Int(-1)));
        assert_eq!(read(&[0xff; 4], FieldType::Long, true), Ok(Value::UInt(u32::MAX as u64)));
        assert_eq!(read(&[0xfe, 0xff], FieldType::Short, false), Ok(Value::Int(-2)));
        assert_eq!(read(&[0xe5, 0x07], FieldType::Year, true), Ok(Value::UInt(2021)));
        assert_eq!(read(&[0x80], FieldType::Tiny, false), Ok(Value::Int(-128)));
        assert_eq!(read(&[0x01, 0x00, 0x00, 0x00], FieldType::Int24, false), Ok(Value::Int(1)));
    }

    // Test 2: Floating point
    #[test]
    fn test_floats() {
        assert_eq!(
            read(&1.5f32.to_le_bytes(), FieldType::Float, false),
            Ok(Value::Float(1.5))
        );
        assert_eq!(
            read(&(-0.25f64).to_le_bytes(), FieldType::Double, false),
            Ok(Value::Double(-0.25))
        );
    }

    // Test 3: Dates of every allowed length
    #[test]
    fn test_datetime_lengths() {
        assert_eq!(
            read(&[0], FieldType::DateTime, false),
            Ok(Value::DateTime(MysqlDateTime::default()))
        );
        assert_eq!(
            read(&[4, 0xe5, 0x07, 3, 7], FieldType::Date, false).unwrap().to_string(),
            "2021-03-07"
        );
        assert_eq!(
            read(&[7, 0xe5, 0x07, 3, 7, 13, 5, 9], FieldType::Timestamp, false)
                .unwrap()
                .to_string(),
            "2021-03-07 13:05:09"
        );
        assert_eq!(
            read(&[11, 0xe5, 0x07, 3, 7, 13, 5, 9, 42, 0, 0, 0], FieldType::DateTime, false)
                .unwrap()
                .to_string(),
            "2021-03-07 13:05:09.000042"
        );
    }

    // Test 4: Invalid temporal length
    #[test]
    fn test_invalid_temporal_length() {
        let mut cursor = PacketCursor::new(&[5, 0, 0, 0, 0, 0]);
        assert_eq!(
            read_value(&mut cursor, FieldType::DateTime, false),
            Err(DecodeError::InvalidTemporalLength {
                field_type: "MYSQL_TYPE_DATETIME",
                length: 5
            })
        );

        let mut cursor = PacketCursor::new(&[4, 0, 0, 0, 0]);
        assert!(matches!(
            read_value(&mut cursor, FieldType::Time, false),
            Err(DecodeError::InvalidTemporalLength { length: 4, .. })
        ));
    }

    // Test 5: TIME values
    #[test]
    fn test_time() {
        assert_eq!(
            read(&[8, 1, 1, 0, 0, 0, 2, 3, 4], FieldType::Time, false)
                .unwrap()
                .to_string(),
            "-26:03:04"
        );
        assert_eq!(
            read(&[12, 0, 0, 0, 0, 0, 10, 0, 0, 1, 0, 0, 0], FieldType::Time, false)
                .unwrap()
                .to_string(),
            "10:00:00.000001"
        );
        assert_eq!(
            read(&[0], FieldType::Time2, false),
            Ok(Value::Time(MysqlTime::default()))
        );
    }

    // Test 6: Strings, untyped and NULL
    #[test]
    fn test_strings_and_untyped() {
        assert_eq!(
            read(b"\x06Jobbbb", FieldType::VarString, false),
            Ok(Value::from("Jobbbb"))
        );
        assert_eq!(
            read(b"\x0512.50", FieldType::NewDecimal, false),
            Ok(Value::Text("12.50".into()))
        );
        assert!(matches!(
            read(&[2, 0x00, 0x01], FieldType::Blob, false),
            Ok(Value::Binary(_))
        ));
        assert_eq!(read(&[], FieldType::Null, false), Ok(Value::Null));
    }

    // Test 7: Truncated values underrun
    #[test]
    fn test_truncated() {
        let mut cursor = PacketCursor::new(&[1, 2]);
        assert!(matches!(
            read_value(&mut cursor, FieldType::LongLong, false),
            Err(DecodeError::Underrun { needed: 8, have: 2, .. })
        ));
    }
}
