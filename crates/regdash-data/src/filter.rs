//! Filter evaluation over the record store.

use regdash_core::filter::FilterSpec;
use tracing::{debug, warn};

use crate::store::{RecordStore, RecordView};

/// Stateless evaluator for [`FilterSpec`]s.
pub struct FilterEngine;

impl FilterEngine {
    /// Select the records of `store` matching every constraint in `spec`.
    pub fn apply<'a>(store: &'a RecordStore, spec: &FilterSpec) -> RecordView<'a> {
        Self::apply_to_view(&store.query(), spec)
    }

    /// Narrow an existing view further.
    ///
    /// Filtering twice is equivalent to filtering once with both specs ANDed.
    pub fn apply_to_view<'a>(view: &RecordView<'a>, spec: &FilterSpec) -> RecordView<'a> {
        if spec.is_unfiltered() {
            return view.clone();
        }

        let rows: Vec<_> = view.iter().filter(|r| spec.matches(r)).collect();

        if rows.is_empty() && !view.is_empty() {
            warn!("Filter {:?} matched none of {} records", spec, view.len());
        } else {
            debug!("Filter kept {} of {} records", rows.len(), view.len());
        }

        RecordView::from_rows(rows)
    }
}
