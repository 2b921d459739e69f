//! Decision telemetry: per-evaluation access events, their aggregation into compact usage
//! counters, and best-effort delivery to the collector.
mod event;
mod recorder;

pub use event::{Access, AccessEvent, PackedData, ToggleCounter};
pub use recorder::{EventRecorder, EventRecorderConfig};
