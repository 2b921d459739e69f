use std::collections::HashMap;

use serde::Serialize;

use crate::toggle::Variant;

/// One recorded evaluation decision: the unit recorded per evaluation call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEvent {
    /// Decision timestamp, epoch milliseconds.
    pub time: i64,
    /// Toggle key.
    pub key: String,
    /// The value actually served to the caller.
    pub value: Variant,
    /// Variation index, when one was resolved.
    pub index: Option<usize>,
    /// Toggle version, when the toggle existed.
    pub version: Option<u64>,
    /// Why this value was served.
    pub reason: String,
}

/// Aggregated occurrences of one (value, version, variation index) combination.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ToggleCounter {
    pub value: Variant,
    pub version: Option<u64>,
    pub index: Option<usize>,
    pub count: u64,
}

/// The observed time window of a batch plus its per-toggle counters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Access {
    /// Earliest event timestamp in the batch.
    pub start_time: i64,
    /// Latest event timestamp in the batch.
    pub end_time: i64,
    /// Counters keyed by toggle key.
    pub counters: HashMap<String, Vec<ToggleCounter>>,
}

/// One self-contained telemetry document: the raw events of a batch plus their aggregation.
/// Documents require no ordering at the collector.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct PackedData {
    pub events: Vec<AccessEvent>,
    pub access: Access,
}

impl PackedData {
    /// Pack a drained batch. Returns `None` for an empty batch so the caller can skip the
    /// network call entirely.
    pub(crate) fn build(events: Vec<AccessEvent>) -> Option<PackedData> {
        let access = Access::build(&events)?;
        Some(PackedData { events, access })
    }
}

impl Access {
    /// Group events by (toggle key, variation index, version), each counter keeping one
    /// representative served value and an occurrence count.
    fn build(events: &[AccessEvent]) -> Option<Access> {
        let first = events.first()?;
        let mut start_time = first.time;
        let mut end_time = first.time;
        let mut counters: HashMap<String, Vec<ToggleCounter>> = HashMap::new();

        for event in events {
            start_time = start_time.min(event.time);
            end_time = end_time.max(event.time);

            let slot = counters.entry(event.key.clone()).or_default();
            match slot
                .iter_mut()
                .find(|counter| counter.index == event.index && counter.version == event.version)
            {
                Some(counter) => counter.count += 1,
                None => slot.push(ToggleCounter {
                    value: event.value.clone(),
                    version: event.version,
                    index: event.index,
                    count: 1,
                }),
            }
        }

        Some(Access {
            start_time,
            end_time,
            counters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessEvent, PackedData};
    use crate::toggle::Variant;

    fn event(time: i64, key: &str, value: Variant, index: Option<usize>) -> AccessEvent {
        AccessEvent {
            time,
            key: key.to_owned(),
            value,
            index,
            version: Some(1),
            reason: "default rule".to_owned(),
        }
    }

    #[test]
    fn empty_batch_packs_to_none() {
        assert!(PackedData::build(vec![]).is_none());
    }

    #[test]
    fn identical_decisions_collapse_into_one_counter() {
        let events: Vec<AccessEvent> = (0..5)
            .map(|i| event(1000 + i, "bool_toggle", true.into(), Some(0)))
            .collect();

        let packed = PackedData::build(events).unwrap();
        let counters = &packed.access.counters["bool_toggle"];
        assert_eq!(counters.len(), 1);
        assert_eq!(counters[0].count, 5);
        assert_eq!(counters[0].value, true.into());
        assert_eq!(counters[0].index, Some(0));
    }

    #[test]
    fn distinct_variations_get_distinct_counters() {
        let events = vec![
            event(1, "toggle", "a".into(), Some(0)),
            event(2, "toggle", "b".into(), Some(1)),
            event(3, "toggle", "a".into(), Some(0)),
            event(4, "other", true.into(), Some(0)),
        ];

        let packed = PackedData::build(events).unwrap();
        let counters = &packed.access.counters["toggle"];
        assert_eq!(counters.len(), 2);
        let a = counters.iter().find(|c| c.index == Some(0)).unwrap();
        let b = counters.iter().find(|c| c.index == Some(1)).unwrap();
        assert_eq!(a.count, 2);
        assert_eq!(b.count, 1);
        assert_eq!(packed.access.counters["other"].len(), 1);
    }

    #[test]
    fn window_is_min_to_max() {
        let events = vec![
            event(500, "toggle", true.into(), Some(0)),
            event(100, "toggle", true.into(), Some(0)),
            event(900, "toggle", true.into(), Some(0)),
        ];

        let packed = PackedData::build(events).unwrap();
        assert_eq!(packed.access.start_time, 100);
        assert_eq!(packed.access.end_time, 900);
    }

    #[test]
    fn wire_shape() {
        let packed = PackedData::build(vec![event(42, "toggle", true.into(), None)]).unwrap();
        let body = serde_json::to_value(vec![packed]).unwrap();

        assert_eq!(body[0]["events"][0]["time"], 42);
        assert_eq!(body[0]["events"][0]["value"], true);
        // an absent index is serialized as an explicit null
        assert!(body[0]["events"][0]["index"].is_null());
        assert_eq!(body[0]["access"]["startTime"], 42);
        assert_eq!(body[0]["access"]["endTime"], 42);
        assert_eq!(body[0]["access"]["counters"]["toggle"][0]["count"], 1);
    }
}
