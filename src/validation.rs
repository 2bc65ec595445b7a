// Checks for `POST /upload`, in order; the first failure wins.

use base64::Engine;
use base64::alphabet;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use bytes::Bytes;
use chrono::format::{self, Parsed, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDateTime};

use crate::errors::{AppError, CUSTOMER_INVALID, DATETIME_INVALID, IMAGE_INVALID, TYPE_INVALID};
use crate::models::{MeasureType, UploadRequest, ValidatedUpload};

// Standard alphabet, canonical padding, tolerant of non-zero trailing bits.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

// Extended and basic ISO-8601 layouts. `%#z` takes `Z`, `+03`, `+0300` and `+03:00`.
const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%dT%H%#z",
    "%Y%m%dT%H%M%S%.f%#z",
    "%Y%m%dT%H%M%#z",
    "%Y%m%dT%H%#z",
];

const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H",
    "%Y%m%dT%H%M%S%.f",
    "%Y%m%dT%H%M",
    "%Y%m%dT%H",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

pub fn validate(req: UploadRequest) -> Result<ValidatedUpload, AppError> {
    let image = req.image.unwrap_or_default();
    let image_bytes = decode_base64(&image).ok_or_else(|| AppError::invalid(IMAGE_INVALID))?;

    let measured_at = req
        .measure_datetime
        .as_deref()
        .and_then(parse_iso8601)
        .ok_or_else(|| AppError::invalid(DATETIME_INVALID))?;

    let measure_type = req
        .measure_type
        .as_deref()
        .and_then(MeasureType::parse)
        .ok_or_else(|| AppError::invalid(TYPE_INVALID))?;

    let customer_code = match req.customer_code {
        Some(code) if !code.trim().is_empty() => code,
        _ => return Err(AppError::invalid(CUSTOMER_INVALID)),
    };

    Ok(ValidatedUpload { image, image_bytes, customer_code, measured_at, measure_type })
}

/// Empty input is rejected.
pub fn decode_base64(raw: &str) -> Option<Bytes> {
    if raw.is_empty() {
        return None;
    }
    BASE64.decode(raw).ok().map(Bytes::from)
}

/// Instants without an offset are taken as UTC; bare dates as midnight UTC.
pub fn parse_iso8601(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    if let Some(dt) = ZONED_FORMATS
        .iter()
        .find_map(|fmt| parse_fields(raw, fmt)?.to_datetime().ok())
    {
        return Some(dt);
    }
    LOCAL_FORMATS
        .iter()
        .chain(DATE_FORMATS)
        .find_map(|fmt| parse_fields(raw, fmt)?.to_naive_datetime_with_offset(0).ok())
        .map(|naive: NaiveDateTime| naive.and_utc().fixed_offset())
}

// Omitted minutes (`T10Z`) and times (`2023-01-01`) default to zero.
fn parse_fields(raw: &str, fmt: &str) -> Option<Parsed> {
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, raw, StrftimeItems::new(fmt)).ok()?;
    if !fmt.contains("%H") {
        parsed.set_hour(0).ok()?;
    }
    if !fmt.contains("%M") {
        parsed.set_minute(0).ok()?;
    }
    Some(parsed)
}
