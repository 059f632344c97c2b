use compare_core::DiffReason;
use compare_store::{KeyValueStore, StoreResult};

use super::text;

/// ZSCAN the source; every member must exist on the target with the same
/// score.
pub(super) async fn compare_scores(
    source: &dyn KeyValueStore,
    target: &dyn KeyValueStore,
    key: &str,
    batch_size: usize,
) -> StoreResult<Option<DiffReason>> {
    let mut cursor = 0;
    loop {
        let (next, members) = match source.zscan(key, cursor, batch_size).await {
            Ok(page) => page,
            Err(e) => {
                return Ok(Some(DiffReason::ScanFailed {
                    command: "ZSCAN".to_string(),
                    error: e.to_string(),
                }))
            }
        };

        for (member, raw_score) in &members {
            let source_score = match raw_score.parse::<f64>() {
                Ok(score) => score,
                Err(e) => {
                    return Ok(Some(DiffReason::ScoreParse {
                        member: text(member),
                        score: raw_score.clone(),
                        error: e.to_string(),
                    }))
                }
            };

            let rank = target.zrank(key, member).await?;
            let target_score = target.zscore(key, member).await?;
            let (Some(_), Some(target_score)) = (rank, target_score) else {
                return Ok(Some(DiffReason::ZsetMemberMissing {
                    member: text(member),
                }));
            };

            if target_score != source_score {
                return Ok(Some(DiffReason::ZsetScoreMismatch {
                    member: text(member),
                    source_score,
                    target_score,
                }));
            }
        }

        if next == 0 {
            return Ok(None);
        }
        cursor = next;
    }
}
