//! Column metadata: field types and column definitions.

use std::fmt;

use compact_str::CompactString;
use serde::{Serialize, Serializer};

use super::flags::FieldDetail;

/// MySQL column type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Decimal,
    Tiny,
    Short,
    Long,
    Float,
    Double,
    Null,
    Timestamp,
    LongLong,
    Int24,
    Date,
    Time,
    DateTime,
    Year,
    NewDate,
    VarChar,
    Bit,
    Timestamp2,
    DateTime2,
    Time2,
    Json,
    NewDecimal,
    Enum,
    Set,
    TinyBlob,
    MediumBlob,
    LongBlob,
    Blob,
    VarString,
    String,
    Geometry,
    Unknown(u8),
}

impl FieldType {
    pub fn from_u8(code: u8) -> Self {
        match code {
            0 => FieldType::Decimal,
            1 => FieldType::Tiny,
            2 => FieldType::Short,
            3 => FieldType::Long,
            4 => FieldType::Float,
            5 => FieldType::Double,
            6 => FieldType::Null,
            7 => FieldType::Timestamp,
            8 => FieldType::LongLong,
            9 => FieldType::Int24,
            10 => FieldType::Date,
            11 => FieldType::Time,
            12 => FieldType::DateTime,
            13 => FieldType::Year,
            14 => FieldType::NewDate,
            15 => FieldType::VarChar,
            16 => FieldType::Bit,
            17 => FieldType::Timestamp2,
            18 => FieldType::DateTime2,
            19 => FieldType::Time2,
            245 => FieldType::Json,
            246 => FieldType::NewDecimal,
            247 => FieldType::Enum,
            248 => FieldType::Set,
            249 => FieldType::TinyBlob,
            250 => FieldType::MediumBlob,
            251 => FieldType::LongBlob,
            252 => FieldType::Blob,
            253 => FieldType::VarString,
            254 => FieldType::String,
            255 => FieldType::Geometry,
            other => FieldType::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            FieldType::Decimal => 0,
            FieldType::Tiny => 1,
            FieldType::Short => 2,
            FieldType::Long => 3,
            FieldType::Float => 4,
            FieldType::Double => 5,
            FieldType::Null => 6,
            FieldType::Timestamp => 7,
            FieldType::LongLong => 8,
            FieldType::Int24 => 9,
            FieldType::Date => 10,
            FieldType::Time => 11,
            FieldType::DateTime => 12,
            FieldType::Year => 13,
            FieldType::NewDate => 14,
            FieldType::VarChar => 15,
            FieldType::Bit => 16,
            FieldType::Timestamp2 => 17,
            FieldType::DateTime2 => 18,
            FieldType::Time2 => 19,
            FieldType::Json => 245,
            FieldType::NewDecimal => 246,
            FieldType::Enum => 247,
            FieldType::Set => 248,
            FieldType::TinyBlob => 249,
            FieldType::MediumBlob => 250,
            FieldType::LongBlob => 251,
            FieldType::Blob => 252,
            FieldType::VarString => 253,
            FieldType::String => 254,
            FieldType::Geometry => 255,
            FieldType::Unknown(code) => code,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldType::Decimal => "MYSQL_TYPE_DECIMAL",
            FieldType::Tiny => "MYSQL_TYPE_TINY",
            FieldType::Short => "MYSQL_TYPE_SHORT",
            FieldType::Long => "MYSQL_TYPE_LONG",
            FieldType::Float => "MYSQL_TYPE_FLOAT",
            FieldType::Double => "MYSQL_TYPE_DOUBLE",
            FieldType::Null => "MYSQL_TYPE_NULL",
            FieldType::Timestamp => "MYSQL_TYPE_TIMESTAMP",
            FieldType::LongLong => "MYSQL_TYPE_LONGLONG",
            FieldType::Int24 => "MYSQL_TYPE_INT24",
            FieldType::Date => "MYSQL_TYPE_DATE",
            FieldType::Time => "MYSQL_TYPE_TIME",
            FieldType::DateTime => "MYSQL_TYPE_DATETIME",
            FieldType::Year => "MYSQL_TYPE_YEAR",
            FieldType::NewDate => "MYSQL_TYPE_NEWDATE",
            FieldType::VarChar => "MYSQL_TYPE_VARCHAR",
            FieldType::Bit => "MYSQL_TYPE_BIT",
            FieldType::Timestamp2 => "MYSQL_TYPE_TIMESTAMP2",
            FieldType::DateTime2 => "MYSQL_TYPE_DATETIME2",
            FieldType::Time2 => "MYSQL_TYPE_TIME2",
            FieldType::Json => "MYSQL_TYPE_JSON",
            FieldType::NewDecimal => "MYSQL_TYPE_NEWDECIMAL",
            FieldType::Enum => "MYSQL_TYPE_ENUM",
            FieldType::Set => "MYSQL_TYPE_SET",
            FieldType::TinyBlob => "MYSQL_TYPE_TINY_BLOB",
            FieldType::MediumBlob => "MYSQL_TYPE_MEDIUM_BLOB",
            FieldType::LongBlob => "MYSQL_TYPE_LONG_BLOB",
            FieldType::Blob => "MYSQL_TYPE_BLOB",
            FieldType::VarString => "MYSQL_TYPE_VAR_STRING",
            FieldType::String => "MYSQL_TYPE_STRING",
            FieldType::Geometry => "MYSQL_TYPE_GEOMETRY",
            FieldType::Unknown(_) => "UNRECOGNISED",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Fixed-length block that follows the names in a column definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypeInfo {
    /// Length of the fixed fields, always 0x0c in practice.
    pub length_marker: u8,
    pub charset: u16,
    pub max_size: u32,
    pub field_type: FieldType,
    pub detail: FieldDetail,
    pub decimals: u8,
}

impl TypeInfo {
    pub fn is_unsigned(&self) -> bool {
        self.detail.contains(FieldDetail::UNSIGNED)
    }
}

/// One column (or prepared statement parameter) definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub catalog: CompactString,
    pub schema: CompactString,
    pub table: CompactString,
    pub table_alias: CompactString,
    pub column: CompactString,
    pub column_alias: CompactString,
    pub type_info: TypeInfo,
}

/// Type of one bound statement parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamType {
    pub field_type: FieldType,
    pub unsigned: bool,
}

impl ParamType {
    /// Parameter flag bit marking an unsigned value.
    pub const UNSIGNED_FLAG: u8 = 0x80;

    pub fn from_wire(type_code: u8, flag: u8) -> Self {
        Self {
            field_type: FieldType::from_u8(type_code),
            unsigned: flag & Self::UNSIGNED_FLAG != 0,
        }
    }
}

impl From<&ColumnInfo> for ParamType {
    fn from(column: &ColumnInfo) -> Self {
        Self {
            field_type: column.type_info.field_type,
            unsigned: column.type_info.is_unsigned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test 1: Known codes round-trip
    #[test]
    fn test_field_type_round_trip() {
        for code in (0u8..=19).chain(245..=255) {
            let ft = FieldType::from_u8(code);
            assert!(!matches!(ft, FieldType::Unknown(_)), "code {code}");
            assert_eq!(ft.code(), code);
        }
    }

    // Test 2: Unknown codes keep their value and display as unrecognised
    #[test]
    fn test_field_type_unknown() {
        let ft = FieldType::from_u8(100);
        assert_eq!(ft, FieldType::Unknown(100));
        assert_eq!(ft.code(), 100);
        assert_eq!(ft.to_string(), "UNRECOGNISED");
    }

    // Test 3: Names
    #[test]
    fn test_field_type_names() {
        assert_eq!(FieldType::Long.name(), "MYSQL_TYPE_LONG");
        assert_eq!(FieldType::VarString.name(), "MYSQL_TYPE_VAR_STRING");
        assert_eq!(FieldType::from_u8(253), FieldType::VarString);
    }

    // Test 4: Parameter flag decoding
    #[test]
    fn test_param_type_from_wire() {
        let p = ParamType::from_wire(8, 0x80);
        assert_eq!(p.field_type, FieldType::LongLong);
        assert!(p.unsigned);

        let p = ParamType::from_wire(254, 0x00);
        assert_eq!(p.field_type, FieldType::String);
        assert!(!p.unsigned);
    }
}
