use compare_core::DiffReason;
use compare_store::{KeyValueStore, StoreResult};

use super::text;

/// Every source member must be a member on the target.
///
/// Only containment in one direction is checked here; extra target members
/// are caught by the cardinality check that runs first.
pub(super) async fn compare_members(
    source: &dyn KeyValueStore,
    target: &dyn KeyValueStore,
    key: &str,
    batch_size: usize,
) -> StoreResult<Option<DiffReason>> {
    let mut cursor = 0;
    loop {
        let (next, members) = match source.sscan(key, cursor, batch_size).await {
            Ok(page) => page,
            Err(e) => {
                return Ok(Some(DiffReason::ScanFailed {
                    command: "SSCAN".to_string(),
                    error: e.to_string(),
                }))
            }
        };

        for member in &members {
            if !target.sismember(key, member).await? {
                return Ok(Some(DiffReason::SetMemberMissing {
                    member: text(member),
                }));
            }
        }

        if next == 0 {
            return Ok(None);
        }
        cursor = next;
    }
}
