//! Display order: most severe first, newest first within a severity band.

use std::cmp::Ordering;

use super::model::Incident;
use super::severity::classify;

/// Compare two incidents for display. `Less` means `a` is shown before `b`.
pub fn compare(a: &Incident, b: &Incident) -> Ordering {
    classify(a)
        .rank()
        .cmp(&classify(b).rank())
        .then_with(|| b.reference_time().cmp(&a.reference_time()))
}

/// Stable sort into display order. Equal keys keep their relative order.
pub fn sort_incidents(incidents: &mut [Incident]) {
    incidents.sort_by_cached_key(|inc| {
        (
            classify(inc).rank(),
            std::cmp::Reverse(inc.reference_time()),
        )
    });
}
