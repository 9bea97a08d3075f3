//! Subscription index (sorted prefix table)
//!
//! Design:
//! - Keep filters in a Vec sorted lexicographically by topic prefix.
//! - subscribe/unsubscribe: O(log N) search + O(N) insert/remove shift.
//! - `match_topic` hot-path: forward scan with early-exit when prefix > topic.
//! - Returns `SmallVec` of keys to avoid heap alloc in common cases.
//! - Dedups results because a key may subscribe to overlapping prefixes.
//!
//! A key is whatever the owner routes to: a local sink or a remote peer.

use crate::topic::Topic;
use smallvec::SmallVec;

/// Compact integer ID of a routing target.
pub type SinkKey = u64;

#[derive(Debug, Clone)]
struct Filter {
    prefix: Topic,
    /// Inline up to 4 keys without heap allocation (common low fanout).
    keys: SmallVec<[SinkKey; 4]>,
}

#[derive(Debug, Default, Clone)]
pub struct SubscriptionIndex {
    filters: Vec<Filter>,
}

impl SubscriptionIndex {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Adds a subscription for `key` to `prefix`.
    ///
    /// Returns `true` if the prefix was not in the index before.
    pub fn subscribe(&mut self, key: SinkKey, prefix: Topic) -> bool {
        match self.filters.binary_search_by(|f| f.prefix.cmp(&prefix)) {
            Ok(idx) => {
                let keys = &mut self.filters[idx].keys;
                if !keys.contains(&key) {
                    keys.push(key);
                }
                false
            }
            Err(idx) => {
                let mut keys = SmallVec::<[SinkKey; 4]>::new();
                keys.push(key);
                self.filters.insert(idx, Filter { prefix, keys });
                true
            }
        }
    }

    /// Removes the subscription of `key` to `prefix`.
    ///
    /// Returns `true` if no key is left on that prefix.
    pub fn unsubscribe(&mut self, key: SinkKey, prefix: &str) -> bool {
        if let Ok(idx) = self
            .filters
            .binary_search_by(|f| f.prefix.as_str().cmp(prefix))
        {
            let keys = &mut self.filters[idx].keys;
            if let Some(pos) = keys.iter().position(|k| *k == key) {
                keys.swap_remove(pos);
            }
            if keys.is_empty() {
                self.filters.remove(idx);
                return true;
            }
        }
        false
    }

    /// Remove `key` from every prefix (sink dropped or peer gone).
    ///
    /// Complexity: O(N) scan, acceptable on churn events.
    pub fn remove_key_everywhere(&mut self, key: SinkKey) {
        self.filters.retain_mut(|f| {
            if let Some(pos) = f.keys.iter().position(|k| *k == key) {
                f.keys.swap_remove(pos);
            }
            !f.keys.is_empty()
        });
    }

    /// Replace every prefix of `key` with `prefixes`.
    pub fn replace_key<I>(&mut self, key: SinkKey, prefixes: I)
    where
        I: IntoIterator<Item = Topic>,
    {
        self.remove_key_everywhere(key);
        for prefix in prefixes {
            self.subscribe(key, prefix);
        }
    }

    /// Match a topic against all filters.
    ///
    /// Returns a deduplicated, sorted list of keys.
    #[must_use]
    pub fn match_topic(&self, topic: &str) -> SmallVec<[SinkKey; 16]> {
        let mut out: SmallVec<[SinkKey; 16]> = SmallVec::new();

        for f in &self.filters {
            let p = f.prefix.as_bytes();

            // If prefix > topic, it cannot be a prefix of topic.
            // e.g. prefix="apply" > topic="apple" => stop.
            if p > topic.as_bytes() {
                break;
            }

            if f.prefix.prefix_of(topic) {
                out.extend_from_slice(&f.keys);
            }
        }

        if out.len() > 1 {
            out.sort_unstable();
            out.dedup();
        }

        out
    }

    /// All distinct prefixes, in ascending order.
    pub fn prefixes(&self) -> impl Iterator<Item = &Topic> + '_ {
        self.filters.iter().map(|f| &f.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_and_match() {
        let mut idx = SubscriptionIndex::new();

        idx.subscribe(1, Topic::from("/a"));
        idx.subscribe(2, Topic::from("/a/b"));
        idx.subscribe(3, Topic::from("/b"));

        let m = idx.match_topic("/a/b/c");
        assert_eq!(m.as_slice(), &[1, 2]);

        let m = idx.match_topic("/banana");
        assert_eq!(m.as_slice(), &[3]);
    }

    #[test]
    fn dedup_nested_prefixes() {
        let mut idx = SubscriptionIndex::new();

        idx.subscribe(7, Topic::from("/a"));
        idx.subscribe(7, Topic::from("/a/b"));

        let m = idx.match_topic("/a/b/c/d");
        assert_eq!(m.as_slice(), &[7]);
    }

    #[test]
    fn remove_key_everywhere_cleans_empty_entries() {
        let mut idx = SubscriptionIndex::new();

        idx.subscribe(1, Topic::from("/a"));
        idx.subscribe(2, Topic::from("/a"));
        idx.subscribe(1, Topic::from("/a/b"));

        idx.remove_key_everywhere(1);

        let m = idx.match_topic("/a/b/c");
        assert_eq!(m.as_slice(), &[2]);
        assert_eq!(idx.prefixes().count(), 1);
    }

    #[test]
    fn unsubscribe_reports_last_key() {
        let mut idx = SubscriptionIndex::new();

        assert!(idx.subscribe(1, Topic::from("/x")));
        assert!(!idx.subscribe(2, Topic::from("/x")));
        assert!(!idx.unsubscribe(1, "/x"));
        assert!(idx.unsubscribe(2, "/x"));
        assert!(idx.is_empty());
    }

    #[test]
    fn replace_key_swaps_filter() {
        let mut idx = SubscriptionIndex::new();

        idx.subscribe(4, Topic::from("/old"));
        idx.replace_key(4, [Topic::from("/new"), Topic::from("/also")]);

        assert!(idx.match_topic("/old/1").is_empty());
        assert_eq!(idx.match_topic("/new/1").as_slice(), &[4]);
        let prefixes: Vec<&str> = idx.prefixes().map(Topic::as_str).collect();
        assert_eq!(prefixes, ["/also", "/new"]);
    }
}
