use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset};
use parking_lot::RwLock;
use std::collections::HashSet;

use crate::models::MeasureType;

/// Calendar month a reading is billed to, taken in the offset the client sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BillingPeriod {
    pub year: i32,
    pub month: u32,
}

impl BillingPeriod {
    pub fn of(measured_at: &DateTime<FixedOffset>) -> Self {
        Self { year: measured_at.year(), month: measured_at.month() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReadingKey {
    pub customer_code: String,
    pub measure_type: MeasureType,
    pub period: BillingPeriod,
}

impl ReadingKey {
    pub fn new(customer_code: &str, measured_at: &DateTime<FixedOffset>, measure_type: MeasureType) -> Self {
        Self {
            customer_code: customer_code.to_string(),
            measure_type,
            period: BillingPeriod::of(measured_at),
        }
    }
}

#[async_trait]
pub trait ReadingRepository: Send + Sync {
    /// True when this customer already reported this category for the month.
    async fn exists(&self, customer_code: &str, measured_at: &DateTime<FixedOffset>, measure_type: MeasureType) -> bool;

    async fn record(&self, customer_code: &str, measured_at: &DateTime<FixedOffset>, measure_type: MeasureType);
}

/// Process-local log of accepted readings.
#[derive(Default)]
pub struct InMemoryReadingLog {
    seen: RwLock<HashSet<ReadingKey>>,
}

impl InMemoryReadingLog {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.seen.read().len() }
}

#[async_trait]
impl ReadingRepository for InMemoryReadingLog {
    async fn exists(&self, customer_code: &str, measured_at: &DateTime<FixedOffset>, measure_type: MeasureType) -> bool {
        self.seen.read().contains(&ReadingKey::new(customer_code, measured_at, measure_type))
    }

    async fn record(&self, customer_code: &str, measured_at: &DateTime<FixedOffset>, measure_type: MeasureType) {
        let key = ReadingKey::new(customer_code, measured_at, measure_type);
        tracing::debug!(customer = %key.customer_code, kind = %measure_type, year = key.period.year, month = key.period.month, "📝 Recording reading");
        self.seen.write().insert(key);
        tracing::debug!("{} readings on record", self.len());
    }
}

/// Never reports a duplicate and forgets everything it is told.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverRecorded;

#[async_trait]
impl ReadingRepository for NeverRecorded {
    async fn exists(&self, _: &str, _: &DateTime<FixedOffset>, _: MeasureType) -> bool { false }

    async fn record(&self, _: &str, _: &DateTime<FixedOffset>, _: MeasureType) {}
}
