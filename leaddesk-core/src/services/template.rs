//! Downloadable CSV template for appointment imports

use crate::domain::result::{Error, Result};
use crate::domain::APPOINTMENT_COLUMNS;

pub const TEMPLATE_FILE_NAME: &str = "appointments_template.csv";
pub const TEMPLATE_MIME_TYPE: &str = "text/csv";

/// Header-only CSV with every appointment column
pub fn appointment_template() -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(APPOINTMENT_COLUMNS)
        .map_err(|e| Error::Other(format!("Failed to write template: {}", e)))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Other(format!("Failed to write template: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| Error::Other(format!("Template is not UTF-8: {}", e)))
}
