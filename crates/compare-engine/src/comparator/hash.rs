use compare_core::DiffReason;
use compare_store::{KeyValueStore, StoreResult};

use super::text;

/// HSCAN the source and HGET every field on the target. A field missing on
/// the target is reported with an empty target value.
pub(super) async fn compare_fields(
    source: &dyn KeyValueStore,
    target: &dyn KeyValueStore,
    key: &str,
    batch_size: usize,
) -> StoreResult<Option<DiffReason>> {
    let mut cursor = 0;
    loop {
        let (next, fields) = match source.hscan(key, cursor, batch_size).await {
            Ok(page) => page,
            Err(e) => {
                return Ok(Some(DiffReason::ScanFailed {
                    command: "HSCAN".to_string(),
                    error: e.to_string(),
                }))
            }
        };

        for (field, value) in &fields {
            let other = target.hget(key, field).await?;
            if other.as_ref() != Some(value) {
                return Ok(Some(DiffReason::FieldValueMismatch {
                    field: text(field),
                    source: text(value),
                    target: other.as_deref().map(text).unwrap_or_default(),
                }));
            }
        }

        if next == 0 {
            return Ok(None);
        }
        cursor = next;
    }
}
