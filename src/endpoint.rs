// Dense enum dispatch for SDK-facing endpoint identity.
//
// A tag per route lets the telemetry facade and the request middleware pick
// the matching sub-store with a single array index instead of a string key,
// mirroring the "total function over an array" strategy from the design
// notes. `SUBSTORE_COUNT` is the array size every substore-indexed structure
// allocates.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(usize)]
pub enum EndpointId {
    Auth = 0,
    SplitChanges = 1,
    SegmentChanges = 2,
    MySegments = 3,
    ImpressionsBulk = 4,
    ImpressionsBulkBeacon = 5,
    ImpressionsCount = 6,
    ImpressionsCountBeacon = 7,
    EventsBulk = 8,
    EventsBulkBeacon = 9,
    TelemetryConfig = 10,
    TelemetryRuntime = 11,
    LegacyTime = 12,
    LegacyTimes = 13,
    LegacyCounter = 14,
    LegacyCounters = 15,
    LegacyGauge = 16,
}

pub const SUBSTORE_COUNT: usize = 17;

const ALL: [EndpointId; SUBSTORE_COUNT] = {
    use EndpointId::*;
    [
        Auth,
        SplitChanges,
        SegmentChanges,
        MySegments,
        ImpressionsBulk,
        ImpressionsBulkBeacon,
        ImpressionsCount,
        ImpressionsCountBeacon,
        EventsBulk,
        EventsBulkBeacon,
        TelemetryConfig,
        TelemetryRuntime,
        LegacyTime,
        LegacyTimes,
        LegacyCounter,
        LegacyCounters,
        LegacyGauge,
    ]
};

impl EndpointId {
    pub fn index(self) -> usize {
        self as usize
    }

    /// Total dispatch from an arbitrary integer tag. Values outside the
    /// known range return `None`; callers on record paths treat that as a
    /// silent no-op and callers on peek paths return empty, per §4.F.
    pub fn from_index(index: usize) -> Option<Self> {
        ALL.get(index).copied()
    }

    /// Every known endpoint, in `index()` order — for callers (admin
    /// `stats`/`dashboard`) that report per-endpoint data across the board
    /// rather than for one endpoint at a time.
    pub fn all() -> [EndpointId; SUBSTORE_COUNT] {
        ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trips() {
        for i in 0..SUBSTORE_COUNT {
            let ep = EndpointId::from_index(i).expect("valid index");
            assert_eq!(ep.index(), i);
        }
    }

    #[test]
    fn out_of_range_index_is_none() {
        assert!(EndpointId::from_index(SUBSTORE_COUNT).is_none());
    }
}
