use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::catalog::ItemId;

/// Ids per runtime backfill request.
pub const RUNTIME_BATCH_SIZE: usize = 25;

/// One entry of the runtime batch reply. `runtime` is `None` when the server
/// genuinely does not know it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RuntimeEntry {
    pub id: ItemId,
    #[serde(default)]
    pub runtime: Option<u32>,
}

/// Memoized runtimes per catalog item, including negative results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeCache {
    entries: HashMap<ItemId, Option<u32>>,
    in_flight: HashSet<ItemId>,
    batch_size: usize,
}

impl Default for RuntimeCache {
    fn default() -> Self {
        Self::new(RUNTIME_BATCH_SIZE)
    }
}

impl RuntimeCache {
    pub fn new(batch_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            in_flight: HashSet::new(),
            batch_size: batch_size.max(1),
        }
    }

    /// `None` when unknown, `Some(None)` for a cached negative result.
    pub fn get(&self, id: ItemId) -> Option<Option<u32>> {
        self.entries.get(&id).copied()
    }

    pub fn is_known(&self, id: ItemId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn is_in_flight(&self, id: ItemId) -> bool {
        self.in_flight.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records a runtime that arrived with the catalog payload itself.
    pub fn seed(&mut self, id: ItemId, runtime: u32) {
        self.entries.insert(id, Some(runtime));
    }

    /// Partitions the ids that are neither cached nor already requested into
    /// batches, and marks them as in flight. One request per returned batch.
    pub fn ensure(&mut self, ids: impl IntoIterator<Item = ItemId>) -> Vec<Vec<ItemId>> {
        let mut seen = HashSet::new();
        let missing: Vec<ItemId> = ids
            .into_iter()
            .filter(|id| !self.entries.contains_key(id) && !self.in_flight.contains(id))
            .filter(|id| seen.insert(*id))
            .collect();
        self.in_flight.extend(missing.iter().copied());
        missing
            .chunks(self.batch_size)
            .map(<[ItemId]>::to_vec)
            .collect()
    }

    /// Stores a batch reply. Requested ids absent from the reply are cached
    /// as unknown so they are not asked for again.
    pub fn complete_batch(&mut self, requested: &[ItemId], reply: &[RuntimeEntry]) {
        let by_id: HashMap<ItemId, Option<u32>> =
            reply.iter().map(|entry| (entry.id, entry.runtime)).collect();
        for id in requested {
            self.in_flight.remove(id);
            self.entries.insert(*id, by_id.get(id).copied().flatten());
        }
    }

    /// A failed batch caches nothing; the ids become eligible again.
    pub fn fail_batch(&mut self, requested: &[ItemId]) {
        for id in requested {
            self.in_flight.remove(id);
        }
    }
}
