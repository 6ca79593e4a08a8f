use super::plugin::{lookup_records, QuerySpec};
use super::{BackendRecord, NetboxApi};
use crate::log::debug;

/// Follows each alias in `records` exactly once.
///
/// Targets are looked up one after another with the original question's
/// `spec`, and their records are appended after all of `records`. Aliases
/// among the appended records are left as they are. A failed target lookup
/// only loses that target's records.
pub async fn resolve_aliases(
    api: &NetboxApi,
    zone: &str,
    mut records: Vec<BackendRecord>,
    spec: QuerySpec,
) -> Vec<BackendRecord> {
    let targets = records
        .iter()
        .filter(|record| record.kind.is_alias())
        .map(|record| record.absolute_value.clone())
        .collect::<Vec<_>>();

    for target in targets {
        match lookup_records(api, zone, &target, spec).await {
            Ok(resolved) => records.extend(resolved),
            Err(err) => debug!("could not resolve alias target {}: {}", target, err),
        }
    }

    records
}
