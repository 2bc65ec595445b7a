use serde::{Serialize, Deserialize};
use chrono::{DateTime, FixedOffset};
use bytes::Bytes;
use std::fmt;

/// Raw upload body. Every field is optional here so the validator can report
/// a missing field with the same message as a malformed one.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct UploadRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub customer_code: Option<String>,
    #[serde(default)]
    pub measure_datetime: Option<String>,
    #[serde(default)]
    pub measure_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum MeasureType {
    Water,
    Gas,
}

impl MeasureType {
    /// Exact, case-sensitive match on the wire names.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "WATER" => Some(Self::Water),
            "GAS" => Some(Self::Gas),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Water => "WATER",
            Self::Gas => "GAS",
        }
    }
}

impl fmt::Display for MeasureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An upload that passed every check in `validation::validate`.
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub image: String,
    pub image_bytes: Bytes,
    pub customer_code: String,
    pub measured_at: DateTime<FixedOffset>,
    pub measure_type: MeasureType,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UploadResponse {
    pub image_url: String,
    pub measure_value: String,
    pub measure_uuid: String,
}
