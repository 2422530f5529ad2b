use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{
    domain::{DataKind, KommuneId, ValgstedId},
    protocol::ElectionSnapshot,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: DataKind,
    pub kommune_id: KommuneId,
    pub valgsted_id: Option<ValgstedId>,
}

impl CacheKey {
    pub fn kommune(kommune_id: KommuneId) -> Self {
        Self {
            kind: DataKind::KommuneResults,
            kommune_id,
            valgsted_id: None,
        }
    }

    pub fn valgsted(kommune_id: KommuneId, valgsted_id: ValgstedId) -> Self {
        Self {
            kind: DataKind::ValgstedResults,
            kommune_id,
            valgsted_id: Some(valgsted_id),
        }
    }

    pub fn kandidat(kommune_id: KommuneId) -> Self {
        Self {
            kind: DataKind::KandidatStatus,
            kommune_id,
            valgsted_id: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: ElectionSnapshot,
    pub fetched_at: DateTime<Utc>,
}

/// Per-process read cache for fetched election payloads. Entries are
/// replaced wholesale, never merged; whatever write lands last for a key
/// wins.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: CacheKey, data: ElectionSnapshot) {
        self.entries.insert(
            key,
            CacheEntry {
                data,
                fetched_at: Utc::now(),
            },
        );
    }

    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Timestamp of the most recent write, if any.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.entries.values().map(|entry| entry.fetched_at).max()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
