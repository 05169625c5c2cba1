use tracing::{error, info, warn};

use crate::asset::AssetTree;
use crate::error::{ErrorKind, FragmentFailure, PersistorError};
use crate::types::{Parameters, RowValues};

/// Parameter every fragment sees as `1` during a dry run; mutating clauses guard on it.
pub const DRY_RUN_PARAMETER: &str = "dry_run";

/// Run every fragment in `assets` through `run_fragment` with `dry_run` forced to `1`.
///
/// Failures whose kind is listed in `expected` are collected and reported together once
/// the whole tree has been walked; any other failure aborts the walk at once.
///
/// # Errors
/// Returns `PersistorError::DryRunError` naming every fragment that failed with an
/// expected kind, or the first unexpected error unchanged.
pub fn dry_run<F>(
    assets: &AssetTree,
    parameters: &Parameters,
    expected: &[ErrorKind],
    mut run_fragment: F,
) -> Result<(), PersistorError>
where
    F: FnMut(&str, &Parameters) -> Result<(), PersistorError>,
{
    let mut parameters = parameters.clone();
    parameters.insert(DRY_RUN_PARAMETER.to_string(), RowValues::Int(1));

    info!(key = "persistor.dry_run.on");
    let mut failures = Vec::new();
    for (name, query) in assets.walk() {
        info!(key = "persistor.dry_run.try", path = %name);
        match run_fragment(query, &parameters) {
            Ok(()) => {}
            Err(e) if expected.contains(&e.kind()) => {
                warn!(key = "persistor.dry_run.error", path = %name, error = %e);
                failures.push(FragmentFailure { name, error: e });
            }
            Err(e) => {
                error!(key = "persistor.dry_run.error", path = %name, error = %e, "unexpected");
                return Err(e);
            }
        }
    }

    if !failures.is_empty() {
        let paths: Vec<&str> = failures.iter().map(|f| f.name.as_str()).collect();
        error!(key = "persistor.dry_run.errors", ?paths);
        return Err(PersistorError::DryRunError(failures));
    }
    info!(key = "persistor.dry_run.end");
    Ok(())
}
