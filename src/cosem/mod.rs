//! The cosem module decodes the application data of a data notification:
//! OBIS object codes, COSEM data-type tags and the record stream itself.

pub mod data_type;
pub mod obis;
pub mod record;

pub use data_type::DataType;
pub use obis::{CodeType, Medium, ObisCode};
pub use record::{decode_record_list, decode_records, format_timestamp, ObisRecord, RecordValue, Scale};
