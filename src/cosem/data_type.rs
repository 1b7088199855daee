//! COSEM data-type tags (IEC 62056-6-2, A-XDR encoding).

use std::fmt;

/// Data-type tag preceding every encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    NullData,
    Array,
    Structure,
    Boolean,
    BitString,
    DoubleLong,
    DoubleLongUnsigned,
    OctetString,
    VisibleString,
    Utf8String,
    BinaryCodedDecimal,
    Integer,
    Long,
    Unsigned,
    LongUnsigned,
    CompactArray,
    Long64,
    Long64Unsigned,
    Enum,
    Float32,
    Float64,
    DateTime,
    Date,
    Time,
}

impl DataType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        let data_type = match tag {
            0x00 => DataType::NullData,
            0x01 => DataType::Array,
            0x02 => DataType::Structure,
            0x03 => DataType::Boolean,
            0x04 => DataType::BitString,
            0x05 => DataType::DoubleLong,
            0x06 => DataType::DoubleLongUnsigned,
            0x09 => DataType::OctetString,
            0x0A => DataType::VisibleString,
            0x0C => DataType::Utf8String,
            0x0D => DataType::BinaryCodedDecimal,
            0x0F => DataType::Integer,
            0x10 => DataType::Long,
            0x11 => DataType::Unsigned,
            0x12 => DataType::LongUnsigned,
            0x13 => DataType::CompactArray,
            0x14 => DataType::Long64,
            0x15 => DataType::Long64Unsigned,
            0x16 => DataType::Enum,
            0x17 => DataType::Float32,
            0x18 => DataType::Float64,
            0x19 => DataType::DateTime,
            0x1A => DataType::Date,
            0x1B => DataType::Time,
            _ => return None,
        };
        Some(data_type)
    }

    pub fn tag(self) -> u8 {
        match self {
            DataType::NullData => 0x00,
            DataType::Array => 0x01,
            DataType::Structure => 0x02,
            DataType::Boolean => 0x03,
            DataType::BitString => 0x04,
            DataType::DoubleLong => 0x05,
            DataType::DoubleLongUnsigned => 0x06,
            DataType::OctetString => 0x09,
            DataType::VisibleString => 0x0A,
            DataType::Utf8String => 0x0C,
            DataType::BinaryCodedDecimal => 0x0D,
            DataType::Integer => 0x0F,
            DataType::Long => 0x10,
            DataType::Unsigned => 0x11,
            DataType::LongUnsigned => 0x12,
            DataType::CompactArray => 0x13,
            DataType::Long64 => 0x14,
            DataType::Long64Unsigned => 0x15,
            DataType::Enum => 0x16,
            DataType::Float32 => 0x17,
            DataType::Float64 => 0x18,
            DataType::DateTime => 0x19,
            DataType::Date => 0x1A,
            DataType::Time => 0x1B,
        }
    }

    /// Whether the record decoder knows how to read values of this type.
    pub fn is_decodable(self) -> bool {
        matches!(
            self,
            DataType::DoubleLongUnsigned | DataType::LongUnsigned | DataType::OctetString
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}(0x{:02X})", self.tag())
    }
}
