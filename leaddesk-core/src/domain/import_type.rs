//! Import types and the registry mapping them to backing tables

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::Error;

/// Glyph shown for import types the registry does not know
const FALLBACK_GLYPH: &str = "📄";

/// The kinds of data that can be imported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportType {
    Appointments,
    Calls,
    Leads,
    AdSpend,
}

impl ImportType {
    pub const ALL: [ImportType; 4] = [
        ImportType::Appointments,
        ImportType::Calls,
        ImportType::Leads,
        ImportType::AdSpend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportType::Appointments => "appointments",
            ImportType::Calls => "calls",
            ImportType::Leads => "leads",
            ImportType::AdSpend => "ad_spend",
        }
    }
}

impl fmt::Display for ImportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImportType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownImportType(s.to_string()))
    }
}

/// Static facts about one import type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportTypeDescriptor {
    pub key: String,
    pub table_name: String,
    pub display_name: String,
    pub glyph: String,
}

impl ImportTypeDescriptor {
    pub fn new(key: &str, table_name: &str, display_name: &str, glyph: &str) -> Self {
        Self {
            key: key.to_string(),
            table_name: table_name.to_string(),
            display_name: display_name.to_string(),
            glyph: glyph.to_string(),
        }
    }
}

/// Lookup from import type key to table, display name and glyph
///
/// Built once and shared (behind an `Arc`) by the import, undo and status
/// services. Lookups take the raw type string because stored import records
/// may carry types this build does not know.
#[derive(Debug, Clone)]
pub struct ImportTypeRegistry {
    descriptors: Vec<ImportTypeDescriptor>,
}

impl Default for ImportTypeRegistry {
    fn default() -> Self {
        Self::new(vec![
            ImportTypeDescriptor::new("appointments", "all_appointments", "Appointments", "📅"),
            ImportTypeDescriptor::new("calls", "all_calls", "Calls", "📞"),
            ImportTypeDescriptor::new("leads", "new_leads", "Leads", "👤"),
            ImportTypeDescriptor::new("ad_spend", "facebook_ad_spend", "Ad Spend", "💰"),
        ])
    }
}

impl ImportTypeRegistry {
    pub fn new(descriptors: Vec<ImportTypeDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn descriptor(&self, import_type: &str) -> Option<&ImportTypeDescriptor> {
        self.descriptors.iter().find(|d| d.key == import_type)
    }

    pub fn descriptors(&self) -> &[ImportTypeDescriptor] {
        &self.descriptors
    }

    /// Backing table for a type, or `None` when the type is unknown
    pub fn table_name_for(&self, import_type: &str) -> Option<&str> {
        self.descriptor(import_type).map(|d| d.table_name.as_str())
    }

    /// Human name for a type; unknown types echo back unchanged
    pub fn display_name_for<'a>(&'a self, import_type: &'a str) -> &'a str {
        self.descriptor(import_type)
            .map(|d| d.display_name.as_str())
            .unwrap_or(import_type)
    }

    pub fn glyph_for(&self, import_type: &str) -> &str {
        self.descriptor(import_type)
            .map(|d| d.glyph.as_str())
            .unwrap_or(FALLBACK_GLYPH)
    }
}
