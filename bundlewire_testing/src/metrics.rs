//! Metric capture helpers built on `metrics-util`'s debugging recorder.

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

/// Create a debugging recorder and its snapshotter.
#[must_use]
pub fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

/// Sum of every counter named `name` whose labels include all of `labels`.
///
/// Returns `None` if no matching counter was recorded.
#[must_use]
pub fn counter_value(snapshotter: &Snapshotter, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
    let mut total = None;
    for (key, _, _, value) in snapshotter.snapshot().into_vec() {
        if key.key().name() != name {
            continue;
        }
        let labelled = labels.iter().all(|(k, v)| {
            key.key()
                .labels()
                .any(|label| label.key() == *k && label.value() == *v)
        });
        if let (true, DebugValue::Counter(count)) = (labelled, value) {
            total = Some(total.unwrap_or(0) + count);
        }
    }
    total
}
