//! Portable logical column types and type-modifier decoding.

use serde::{Deserialize, Serialize};

/// A portable logical type, mapped from a native PostgreSQL type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Numeric,
    Char,
    Varchar,
    Text,
    Binary,
    Date,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    Interval,
    Bit,
    Uuid,
    Json,
    /// Anything the mapper does not recognize (extension types, ranges, ...).
    Other,
}

impl LogicalType {
    /// Map a native type name to its logical type.
    pub fn from_native(name: &str) -> Self {
        match name {
            "bool" | "boolean" => Self::Boolean,
            "int2" | "smallint" => Self::SmallInt,
            "int4" | "integer" | "int" => Self::Integer,
            "int8" | "bigint" => Self::BigInt,
            "float4" | "real" => Self::Real,
            "float8" | "double precision" => Self::Double,
            "numeric" | "decimal" => Self::Numeric,
            "char" | "bpchar" | "character" => Self::Char,
            "varchar" | "character varying" => Self::Varchar,
            "text" | "name" => Self::Text,
            "bytea" => Self::Binary,
            "date" => Self::Date,
            "time" => Self::Time,
            "timetz" => Self::TimeTz,
            "timestamp" => Self::Timestamp,
            "timestamptz" => Self::TimestampTz,
            "interval" => Self::Interval,
            "bit" | "varbit" => Self::Bit,
            "uuid" => Self::Uuid,
            "json" | "jsonb" => Self::Json,
            _ => Self::Other,
        }
    }

    /// The canonical native type name for this logical type.
    pub fn native(self) -> &'static str {
        match self {
            Self::Boolean => "bool",
            Self::SmallInt => "int2",
            Self::Integer => "int4",
            Self::BigInt => "int8",
            Self::Real => "float4",
            Self::Double => "float8",
            Self::Numeric => "numeric",
            Self::Char => "char",
            Self::Varchar => "varchar",
            Self::Text => "text",
            Self::Binary => "bytea",
            Self::Date => "date",
            Self::Time => "time",
            Self::TimeTz => "timetz",
            Self::Timestamp => "timestamp",
            Self::TimestampTz => "timestamptz",
            Self::Interval => "interval",
            Self::Bit => "bit",
            Self::Uuid => "uuid",
            Self::Json => "json",
            Self::Other => "text",
        }
    }
}

/// Decode a type modifier into `(length, scale)`.
///
/// NUMERIC packs length and scale into the high and low 16 bits of
/// `typmod - 4`; the temporal types, INTERVAL, and BIT use the raw typmod
/// as their length; everything else stores `length + 4`. A typmod of `-1`
/// carries no length information at all.
pub fn decode_typmod(logical: LogicalType, typmod: i32) -> (Option<i32>, Option<i32>) {
    if typmod == -1 {
        return (None, None);
    }
    match logical {
        LogicalType::Numeric => (Some((typmod - 4) >> 16), Some((typmod - 4) & 0xffff)),
        LogicalType::Time
        | LogicalType::TimeTz
        | LogicalType::Timestamp
        | LogicalType::TimestampTz
        | LogicalType::Interval
        | LogicalType::Bit => (Some(typmod), None),
        _ => (Some(typmod - 4), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_names_round_trip() {
        for lt in [
            LogicalType::Boolean,
            LogicalType::SmallInt,
            LogicalType::Integer,
            LogicalType::BigInt,
            LogicalType::Numeric,
            LogicalType::Varchar,
            LogicalType::Text,
            LogicalType::Timestamp,
            LogicalType::Uuid,
        ] {
            assert_eq!(LogicalType::from_native(lt.native()), lt);
        }
    }

    #[test]
    fn bpchar_maps_to_char() {
        assert_eq!(LogicalType::from_native("bpchar"), LogicalType::Char);
    }

    #[test]
    fn unknown_native_type_maps_to_other() {
        assert_eq!(LogicalType::from_native("hstore"), LogicalType::Other);
    }

    #[test]
    fn numeric_typmod_packs_length_and_scale() {
        // NUMERIC(10,2): typmod = (10 << 16) + 2 + 4
        let typmod = (10 << 16) + 2 + 4;
        assert_eq!(
            decode_typmod(LogicalType::Numeric, typmod),
            (Some(10), Some(2))
        );
    }

    #[test]
    fn varchar_typmod_is_length_plus_four() {
        assert_eq!(
            decode_typmod(LogicalType::Varchar, 259),
            (Some(255), None)
        );
    }

    #[test]
    fn temporal_typmod_is_raw_length() {
        assert_eq!(decode_typmod(LogicalType::Timestamp, 3), (Some(3), None));
        assert_eq!(decode_typmod(LogicalType::Bit, 8), (Some(8), None));
        assert_eq!(decode_typmod(LogicalType::Interval, 6), (Some(6), None));
    }

    #[test]
    fn missing_typmod_yields_no_length_info() {
        for lt in [
            LogicalType::Numeric,
            LogicalType::Varchar,
            LogicalType::Timestamp,
        ] {
            assert_eq!(decode_typmod(lt, -1), (None, None));
        }
    }
}
