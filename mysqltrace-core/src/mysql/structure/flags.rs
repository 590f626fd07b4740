//! Bit-flag sets carried in MySQL packets.
//!
//! Each set is a thin newtype over its wire integer. `Display` joins the names
//! of the set bits with `|`, and serialization produces the list of names.

use std::fmt;
use std::ops::BitOr;

use serde::{Serialize, Serializer};

macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        $name:ident($repr:ty) {
            $($flag:ident = $bit:expr => $label:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name($repr);

        impl $name {
            $(pub const $flag: Self = Self($bit);)*

            const NAMES: &'static [($repr, &'static str)] = &[$(($bit, $label),)*];

            pub const fn from_bits(bits: $repr) -> Self {
                Self(bits)
            }

            pub const fn bits(self) -> $repr {
                self.0
            }

            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// Names of the set bits, lowest first. Bits with no name are skipped.
            pub fn names(self) -> Vec<&'static str> {
                Self::NAMES
                    .iter()
                    .filter(|(bit, _)| self.0 & bit != 0)
                    .map(|(_, label)| *label)
                    .collect()
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.names().join("|"))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x}: {})", stringify!($name), self.0, self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_seq(self.names())
            }
        }
    };
}

flag_set! {
    /// Column definition flags.
    FieldDetail(u16) {
        NOT_NULL = 0x0001 => "NOT_NULL",
        PRIMARY_KEY = 0x0002 => "PRIMARY_KEY",
        UNIQUE_KEY = 0x0004 => "UNIQUE_KEY",
        MULTIPLE_KEY = 0x0008 => "MULTIPLE_KEY",
        BLOB = 0x0010 => "BLOB",
        UNSIGNED = 0x0020 => "UNSIGNED",
        ZEROFILL = 0x0040 => "ZEROFILL",
        BINARY_COLLATION = 0x0080 => "BINARY_COLLATION",
        ENUM = 0x0100 => "ENUM",
        AUTO_INCREMENT = 0x0200 => "AUTO_INCREMENT",
        TIMESTAMP = 0x0400 => "TIMESTAMP",
        SET = 0x0800 => "SET",
        NO_DEFAULT_VALUE = 0x1000 => "NO_DEFAULT_VALUE",
        ON_UPDATE_NOW = 0x2000 => "ON_UPDATE_NOW",
        PART_KEY = 0x4000 => "PART_KEY",
        NUM = 0x8000 => "NUM",
    }
}

flag_set! {
    /// Client/server capability flags exchanged in the handshake.
    CapabilityFlags(u32) {
        LONG_PASSWORD = 1 << 0 => "CLIENT_LONG_PASSWORD",
        FOUND_ROWS = 1 << 1 => "CLIENT_FOUND_ROWS",
        LONG_FLAG = 1 << 2 => "CLIENT_LONG_FLAG",
        CONNECT_WITH_DB = 1 << 3 => "CLIENT_CONNECT_WITH_DB",
        NO_SCHEMA = 1 << 4 => "CLIENT_NO_SCHEMA",
        COMPRESS = 1 << 5 => "CLIENT_COMPRESS",
        ODBC = 1 << 6 => "CLIENT_ODBC",
        LOCAL_FILES = 1 << 7 => "CLIENT_LOCAL_FILES",
        IGNORE_SPACE = 1 << 8 => "CLIENT_IGNORE_SPACE",
        PROTOCOL_41 = 1 << 9 => "CLIENT_PROTOCOL_41",
        INTERACTIVE = 1 << 10 => "CLIENT_INTERACTIVE",
        SSL = 1 << 11 => "CLIENT_SSL",
        IGNORE_SIGPIPE = 1 << 12 => "CLIENT_IGNORE_SIGPIPE",
        TRANSACTIONS = 1 << 13 => "CLIENT_TRANSACTIONS",
        RESERVED = 1 << 14 => "CLIENT_RESERVED",
        SECURE_CONNECTION = 1 << 15 => "CLIENT_SECURE_CONNECTION",
        MULTI_STATEMENTS = 1 << 16 => "CLIENT_MULTI_STATEMENTS",
        MULTI_RESULTS = 1 << 17 => "CLIENT_MULTI_RESULTS",
        PS_MULTI_RESULTS = 1 << 18 => "CLIENT_PS_MULTI_RESULTS",
        PLUGIN_AUTH = 1 << 19 => "CLIENT_PLUGIN_AUTH",
        CONNECT_ATTRS = 1 << 20 => "CLIENT_CONNECT_ATTRS",
        PLUGIN_AUTH_LENENC_CLIENT_DATA = 1 << 21 => "CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA",
        CAN_HANDLE_EXPIRED_PASSWORDS = 1 << 22 => "CLIENT_CAN_HANDLE_EXPIRED_PASSWORDS",
        SESSION_TRACK = 1 << 23 => "CLIENT_SESSION_TRACK",
        DEPRECATE_EOF = 1 << 24 => "CLIENT_DEPRECATE_EOF",
        OPTIONAL_RESULTSET_METADATA = 1 << 25 => "CLIENT_OPTIONAL_RESULTSET_METADATA",
        ZSTD_COMPRESSION_ALGORITHM = 1 << 26 => "CLIENT_ZSTD_COMPRESSION_ALGORITHM",
        QUERY_ATTRIBUTES = 1 << 27 => "CLIENT_QUERY_ATTRIBUTES",
        MULTI_FACTOR_AUTHENTICATION = 1 << 28 => "CLIENT_MULTI_FACTOR_AUTHENTICATION",
        CAPABILITY_EXTENSION = 1 << 29 => "CLIENT_CAPABILITY_EXTENSION",
        SSL_VERIFY_SERVER_CERT = 1 << 30 => "CLIENT_SSL_VERIFY_SERVER_CERT",
        REMEMBER_OPTIONS = 1 << 31 => "CLIENT_REMEMBER_OPTIONS",
    }
}

flag_set! {
    /// Server status flags from OK and EOF packets.
    StatusFlags(u16) {
        IN_TRANS = 0x0001 => "SERVER_STATUS_IN_TRANS",
        AUTOCOMMIT = 0x0002 => "SERVER_STATUS_AUTOCOMMIT",
        MORE_RESULTS_EXISTS = 0x0008 => "SERVER_MORE_RESULTS_EXISTS",
        NO_GOOD_INDEX_USED = 0x0010 => "SERVER_STATUS_NO_GOOD_INDEX_USED",
        NO_INDEX_USED = 0x0020 => "SERVER_STATUS_NO_INDEX_USED",
        CURSOR_EXISTS = 0x0040 => "SERVER_STATUS_CURSOR_EXISTS",
        LAST_ROW_SENT = 0x0080 => "SERVER_STATUS_LAST_ROW_SENT",
        DB_DROPPED = 0x0100 => "SERVER_STATUS_DB_DROPPED",
        NO_BACKSLASH_ESCAPES = 0x0200 => "SERVER_STATUS_NO_BACKSLASH_ESCAPES",
        METADATA_CHANGED = 0x0400 => "SERVER_STATUS_METADATA_CHANGED",
        QUERY_WAS_SLOW = 0x0800 => "SERVER_QUERY_WAS_SLOW",
        PS_OUT_PARAMS = 0x1000 => "SERVER_PS_OUT_PARAMS",
        IN_TRANS_READONLY = 0x2000 => "SERVER_STATUS_IN_TRANS_READONLY",
        SESSION_STATE_CHANGED = 0x4000 => "SERVER_SESSION_STATE_CHANGED",
    }
}
