// Uploaded meter photos, kept for a while and served back by id.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoredImage {
    pub bytes: Bytes,
    stored_at: Instant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemporaryImageHandle {
    pub id: Uuid,
    pub url: String,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<Uuid, StoredImage>,
    // insertion order, oldest first
    order: VecDeque<Uuid>,
}

pub struct TempImageStore {
    base_url: String,
    capacity: usize,
    ttl: Option<Duration>,
    inner: RwLock<Inner>,
}

impl TempImageStore {
    /// `capacity == 0` means unbounded, `ttl == None` never expires.
    pub fn new(base_url: impl Into<String>, capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            capacity,
            ttl,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, id: &Uuid) -> String {
        format!("{}/temp/{}", self.base_url, id)
    }

    pub fn put(&self, bytes: Bytes) -> TemporaryImageHandle {
        let id = Uuid::new_v4();
        let now = Instant::now();
        let entry = StoredImage { bytes, stored_at: now };

        let mut inner = self.inner.write();
        self.purge_expired(&mut inner, now);
        if self.capacity > 0 {
            while inner.order.len() >= self.capacity {
                let Some(oldest) = inner.order.pop_front() else { break };
                inner.entries.remove(&oldest);
                tracing::debug!(%oldest, "🧹 Evicted temporary image (capacity {})", self.capacity);
            }
        }
        inner.entries.insert(id, entry);
        inner.order.push_back(id);
        drop(inner);

        TemporaryImageHandle { id, url: self.url_for(&id) }
    }

    pub fn get(&self, id: &Uuid) -> Option<StoredImage> {
        let inner = self.inner.read();
        let entry = inner.entries.get(id)?;
        if self.is_expired(entry, Instant::now()) {
            return None;
        }
        Some(entry.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    fn is_expired(&self, entry: &StoredImage, now: Instant) -> bool {
        self.ttl.is_some_and(|ttl| now.duration_since(entry.stored_at) >= ttl)
    }

    fn purge_expired(&self, inner: &mut Inner, now: Instant) {
        if self.ttl.is_none() {
            return;
        }
        // insertion order is also expiry order
        while let Some(oldest) = inner.order.front().copied() {
            match inner.entries.get(&oldest) {
                Some(entry) if !self.is_expired(entry, now) => break,
                _ => {
                    inner.order.pop_front();
                    inner.entries.remove(&oldest);
                }
            }
        }
    }
}
