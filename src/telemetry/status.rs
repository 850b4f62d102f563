// Per-endpoint status-code map (§4.E). Fine-grained locking — one mutex per
// endpoint, never one global lock over all of them, matching the design
// note on shared mutable telemetry.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::endpoint::{EndpointId, SUBSTORE_COUNT};

pub struct StatusMap {
    rows: Vec<Mutex<HashMap<u16, i64>>>,
}

impl StatusMap {
    pub fn new() -> Self {
        Self {
            rows: (0..SUBSTORE_COUNT).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    /// `m[status] += 1` under this endpoint's mutex only. Inserts lazily on
    /// first occurrence of a status code.
    pub fn incr(&self, endpoint: EndpointId, status: u16) {
        let Some(row) = self.rows.get(endpoint.index()) else {
            return;
        };
        *row.lock().entry(status).or_insert(0) += 1;
    }

    /// An independent copy taken under the same mutex used by `incr`.
    pub fn peek(&self, endpoint: EndpointId) -> HashMap<u16, i64> {
        match self.rows.get(endpoint.index()) {
            Some(row) => row.lock().clone(),
            None => HashMap::new(),
        }
    }
}

impl Default for StatusMap {
    fn default() -> Self {
        Self::new()
    }
}
