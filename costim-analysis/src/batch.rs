use crate::{error::AnalysisResult, manifest::ManifestEntry};
use tracing::{error, info, warn};

/// Analyses every entry of a manifest in turn.
///
/// A failing entry is logged and counted, then skipped, unless `fail_fast`
/// is set in which case its error ends the batch.
pub fn analyse_batch<M, T, F>(entries: &[M], fail_fast: bool, mut analyse: F) -> AnalysisResult<Vec<T>>
where
    M: ManifestEntry,
    F: FnMut(&M) -> AnalysisResult<T>,
{
    let mut analysed = Vec::with_capacity(entries.len());
    for entry in entries {
        match analyse(entry) {
            Ok(result) => analysed.push(result),
            Err(e) => {
                e.record_failure();
                if fail_fast {
                    error!("Aborting at {}: {e}", entry.path().display());
                    return Err(e);
                }
                warn!("Skipping {}: {e}", entry.path().display());
            }
        }
    }
    info!("Analysed {} of {} files", analysed.len(), entries.len());
    Ok(analysed)
}
