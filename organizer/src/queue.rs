//! Work queue loading for `organizer queue` and `organizer run`.

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::eligibility::Exclusions;
use crate::core::queue::{WorkQueue, build_work_queue};
use crate::io::failure_log::FailureStore;
use crate::io::init::OrganizerPaths;
use crate::io::scan::list_eligible_files;

/// Load the skip set, scan the root and build this run's work queue.
///
/// The skip set is read first: an unreadable failure log aborts before the
/// directory is even listed.
pub fn load_work_queue<S: FailureStore>(
    paths: &OrganizerPaths,
    exclusions: &Exclusions,
    store: &S,
) -> Result<WorkQueue> {
    let skip = store.load_skip_set().context("load failure log")?;
    let candidates = list_eligible_files(&paths.root, exclusions)?;
    let queue = build_work_queue(candidates, &skip);
    debug!(
        queued = queue.files.len(),
        skipped = queue.skipped.len(),
        "work queue built"
    );
    Ok(queue)
}
