//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O.

mod appointment;
mod import_record;
mod import_type;
pub mod result;

pub use appointment::{
    validate_appointment, Appointment, Flag, RawRow, APPOINTMENT_COLUMNS,
    REQUIRED_APPOINTMENT_FIELDS,
};
pub use import_record::{
    format_store_timestamp, parse_store_timestamp, ImportRecord, ImportTrackingData,
    DEFAULT_IMPORTED_BY, IMPORT_HISTORY_TABLE,
};
pub use import_type::{ImportType, ImportTypeDescriptor, ImportTypeRegistry};
