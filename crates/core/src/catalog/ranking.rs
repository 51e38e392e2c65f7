//! Reconciling a ranked id list with a separately fetched record set.
//!
//! Recommendations are ranked by one query (trigram similarity) and loaded by
//! another (the batched detail loader), which returns rows in arbitrary order.

use std::collections::HashMap;
use std::hash::Hash;

/// Maximum number of similar products returned by recommendations.
pub const RECOMMENDATION_LIMIT: usize = 20;

/// Reorder `items` to follow `ranking`.
///
/// Items whose key is absent from `ranking` are dropped; ranked keys with no
/// matching item are skipped.
#[must_use]
pub fn order_by_ranking<T, K, F>(items: Vec<T>, ranking: &[K], key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut by_key: HashMap<K, T> = items.into_iter().map(|item| (key(&item), item)).collect();
    ranking.iter().filter_map(|k| by_key.remove(k)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follows_ranking_order() {
        let fetched = vec![(3, "c"), (1, "a"), (2, "b")];
        let ordered = order_by_ranking(fetched, &[2, 3, 1], |(id, _)| *id);
        assert_eq!(ordered, vec![(2, "b"), (3, "c"), (1, "a")]);
    }

    #[test]
    fn test_missing_and_unranked_entries() {
        let fetched = vec![(1, "a"), (7, "unranked")];
        let ordered = order_by_ranking(fetched, &[5, 1], |(id, _)| *id);
        assert_eq!(ordered, vec![(1, "a")]);
    }
}
