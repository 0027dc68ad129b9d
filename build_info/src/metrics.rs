//! Counters for build-info assembly, emitted through the `metrics` facade.
//!
//! Nothing is recorded until the embedding application installs a recorder.

use metrics::counter;

use crate::error::RequiredField;

/// Record a successfully assembled build-info record.
pub fn build_assembled() {
    counter!("build_info_built_total").increment(1);
}

/// Record a `build()` call rejected for a missing field.
pub fn build_rejected(field: RequiredField) {
    counter!("build_info_rejected_total", "field" => field.as_str()).increment(1);
}
