//! Appointment domain model and row validation

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// One parsed CSV line, keyed by header. Empty cells are `None`.
pub type RawRow = HashMap<String, Option<String>>;

/// Columns of the appointment CSV template, in file order
pub const APPOINTMENT_COLUMNS: [&str; 17] = [
    "date_appointment_created",
    "date_of_appointment",
    "project_name",
    "lead_name",
    "lead_email",
    "lead_phone_number",
    "calendar_name",
    "requested_time",
    "stage_booked",
    "showed",
    "confirmed",
    "agent",
    "agent_number",
    "ghl_id",
    "confirmed_number",
    "status",
    "procedure_ordered",
];

/// Fields that must be present and non-empty on every appointment row
pub const REQUIRED_APPOINTMENT_FIELDS: [&str; 3] =
    ["date_appointment_created", "project_name", "lead_name"];

/// Three-valued yes/no flag
///
/// Stored and serialized as a nullable boolean. `Unknown` is never the same
/// thing as `False`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Flag {
    True,
    False,
    #[default]
    Unknown,
}

impl Flag {
    /// Coerce a loosely typed CSV cell.
    ///
    /// Only the exact literals `true`/`1` and `false`/`0` are recognised.
    pub fn coerce(value: Option<&str>) -> Self {
        match value {
            Some("true" | "1") => Flag::True,
            Some("false" | "0") => Flag::False,
            _ => Flag::Unknown,
        }
    }

    pub fn as_option(self) -> Option<bool> {
        self.into()
    }

    pub fn is_known(self) -> bool {
        self != Flag::Unknown
    }
}

impl From<Option<bool>> for Flag {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Flag::True,
            Some(false) => Flag::False,
            None => Flag::Unknown,
        }
    }
}

impl From<Flag> for Option<bool> {
    fn from(flag: Flag) -> Self {
        match flag {
            Flag::True => Some(true),
            Flag::False => Some(false),
            Flag::Unknown => None,
        }
    }
}

/// A validated appointment row, ready to be written to `all_appointments`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub date_appointment_created: String,
    pub date_of_appointment: Option<String>,
    pub project_name: String,
    pub lead_name: String,
    pub lead_email: Option<String>,
    pub lead_phone_number: Option<String>,
    pub calendar_name: Option<String>,
    pub requested_time: Option<String>,
    pub stage_booked: Option<String>,
    pub showed: Flag,
    pub confirmed: Flag,
    pub agent: Option<String>,
    pub agent_number: Option<String>,
    pub ghl_id: Option<String>,
    pub confirmed_number: Option<String>,
    pub status: Option<String>,
    pub procedure_ordered: Flag,
}

impl Appointment {
    /// Validate and normalize one raw CSV row.
    ///
    /// Fails with a validation error naming every missing required field.
    pub fn from_raw(row: &RawRow) -> Result<Self> {
        let missing: Vec<&str> = REQUIRED_APPOINTMENT_FIELDS
            .iter()
            .copied()
            .filter(|field| text(row, field).is_none())
            .collect();

        if !missing.is_empty() {
            return Err(Error::validation(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }

        let required = |field: &str| text(row, field).unwrap_or_default();

        Ok(Self {
            date_appointment_created: required("date_appointment_created"),
            date_of_appointment: text(row, "date_of_appointment"),
            project_name: required("project_name"),
            lead_name: required("lead_name"),
            lead_email: text(row, "lead_email"),
            lead_phone_number: text(row, "lead_phone_number"),
            calendar_name: text(row, "calendar_name"),
            requested_time: text(row, "requested_time"),
            stage_booked: text(row, "stage_booked"),
            showed: flag(row, "showed"),
            confirmed: flag(row, "confirmed"),
            agent: text(row, "agent"),
            agent_number: text(row, "agent_number"),
            ghl_id: text(row, "ghl_id"),
            confirmed_number: text(row, "confirmed_number"),
            status: text(row, "status"),
            procedure_ordered: flag(row, "procedure_ordered"),
        })
    }

    /// Column map for the backing store. Absent fields are explicit nulls.
    pub fn to_row(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(Error::Other(format!(
                "appointment serialized to non-object: {}",
                other
            ))),
        }
    }
}

/// Validate one raw row as an appointment
pub fn validate_appointment(row: &RawRow) -> Result<Appointment> {
    Appointment::from_raw(row)
}

fn text(row: &RawRow, field: &str) -> Option<String> {
    row.get(field)
        .and_then(|v| v.as_deref())
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

fn flag(row: &RawRow, field: &str) -> Flag {
    Flag::coerce(row.get(field).and_then(|v| v.as_deref()))
}
