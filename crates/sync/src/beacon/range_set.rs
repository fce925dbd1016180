use super::error::RangeSetError;

/// A canonical, disjoint, coalesced set of inclusive `[lo, hi]` ranges over
/// `u64` block numbers. No two stored ranges are adjacent or overlapping:
/// for any `r1, r2` in the set, `r1.hi + 1 < r2.lo`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<(u64, u64)>,
}

impl RangeSet {
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn from_range(lo: u64, hi: u64) -> Self {
        let mut set = Self::new();
        set.merge(lo, hi);
        set
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &(u64, u64)> {
        self.ranges.iter()
    }

    /// Absorbs `[lo, hi]` into the set, coalescing overlaps and adjacency.
    /// Returns the number of integers newly added (not already covered).
    /// A request with `lo > hi` is a no-op.
    pub fn merge(&mut self, lo: u64, hi: u64) -> u64 {
        if lo > hi {
            return 0;
        }

        let pos = self.ranges.partition_point(|&(_, r_hi)| r_hi + 1 < lo);
        let mut new_lo = lo;
        let mut new_hi = hi;
        let mut already_covered: u64 = 0;
        let mut end = pos;

        while end < self.ranges.len() && self.ranges[end].0 <= new_hi.saturating_add(1) {
            let (r_lo, r_hi) = self.ranges[end];
            already_covered += range_len(r_lo.max(new_lo), r_hi.min(new_hi));
            new_lo = new_lo.min(r_lo);
            new_hi = new_hi.max(r_hi);
            end += 1;
        }

        self.ranges.splice(pos..end, [(new_lo, new_hi)]);
        range_len(lo, hi) - already_covered
    }

    /// Punches a hole `[lo, hi]` out of the set, splitting stored ranges as
    /// needed. `lo > hi` is a no-op.
    pub fn reduce(&mut self, lo: u64, hi: u64) {
        if lo > hi {
            return;
        }

        let mut result = Vec::with_capacity(self.ranges.len() + 1);
        for &(r_lo, r_hi) in &self.ranges {
            if r_hi < lo || r_lo > hi {
                result.push((r_lo, r_hi));
                continue;
            }
            if r_lo < lo {
                result.push((r_lo, lo - 1));
            }
            if r_hi > hi {
                result.push((hi + 1, r_hi));
            }
        }
        self.ranges = result;
    }

    /// Number of integers in `[lo, hi]` present in the set.
    pub fn covered(&self, lo: u64, hi: u64) -> u64 {
        if lo > hi {
            return 0;
        }
        self.ranges
            .iter()
            .map(|&(r_lo, r_hi)| range_len(r_lo.max(lo), r_hi.min(hi)))
            .sum()
    }

    /// Sum of the lengths of all stored ranges. A full `[0, u64::MAX]`
    /// range would overflow this convention; callers special-case via
    /// `chunks` instead of relying on `total` for that fringe case.
    pub fn total(&self) -> u64 {
        self.ranges.iter().map(|&(lo, hi)| range_len(lo, hi)).sum()
    }

    /// The highest (rightmost) stored range.
    pub fn le(&self) -> Result<(u64, u64), RangeSetError> {
        self.ranges.last().copied().ok_or(RangeSetError::Empty)
    }

    /// The lowest (leftmost) stored range.
    pub fn ge(&self) -> Result<(u64, u64), RangeSetError> {
        self.ranges.first().copied().ok_or(RangeSetError::Empty)
    }

    /// Splits every stored range into sub-ranges of at most `max_len`
    /// integers, in ascending order.
    pub fn chunks(&self, max_len: u64) -> Vec<(u64, u64)> {
        assert!(max_len > 0, "chunk length must be positive");
        let mut out = Vec::new();
        for &(lo, hi) in &self.ranges {
            let mut cur = lo;
            while cur <= hi {
                let end = cur.saturating_add(max_len - 1).min(hi);
                out.push((cur, end));
                if end == hi {
                    break;
                }
                cur = end + 1;
            }
        }
        out
    }
}

fn range_len(lo: u64, hi: u64) -> u64 {
    if lo > hi {
        0
    } else {
        hi - lo + 1
    }
}

/// A pair of [`RangeSet`]s representing priority-0 and priority-1 unprocessed
/// work, used by the snap-sync pivot subsystem. The beacon engine only needs
/// the plain single-priority `RangeSet` above; this type exists so both
/// consumers share one audited interval-set implementation.
#[derive(Debug, Clone, Default)]
pub struct UnprocessedRanges {
    priority_0: RangeSet,
    priority_1: RangeSet,
}

impl UnprocessedRanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a sub-range of at most `max_len` from priority 0, falling
    /// back to priority 1 when priority 0 is empty.
    pub fn fetch(&mut self, max_len: u64) -> Option<(u64, u64, u8)> {
        if let Ok((lo, hi)) = self.priority_0.le() {
            let hi = hi.min(lo.saturating_add(max_len - 1));
            return Some((lo, hi, 0));
        }
        if let Ok((lo, hi)) = self.priority_1.le() {
            let hi = hi.min(lo.saturating_add(max_len - 1));
            return Some((lo, hi, 1));
        }
        None
    }

    pub fn merge(&mut self, lo: u64, hi: u64) -> u64 {
        self.priority_0.merge(lo, hi)
    }

    pub fn reduce(&mut self, lo: u64, hi: u64) {
        self.priority_0.reduce(lo, hi);
        self.priority_1.reduce(lo, hi);
    }

    /// Splits `[lo, hi]` so the upper half is demoted to priority 0 and the
    /// lower half to priority 1, de-fragmenting peer interleaving.
    pub fn merge_split(&mut self, lo: u64, hi: u64) {
        if lo > hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        self.priority_1.merge(lo, mid);
        self.priority_0.merge(mid + 1, hi);
    }

    pub fn total(&self) -> u64 {
        self.priority_0.total() + self.priority_1.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn merge_coalesces_adjacent_ranges() {
        let mut set = RangeSet::new();
        set.merge(1, 5);
        set.merge(6, 10);
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![(1, 10)]);
    }

    #[test]
    fn merge_coalesces_overlapping_ranges() {
        let mut set = RangeSet::new();
        set.merge(1, 10);
        let added = set.merge(5, 15);
        assert_eq!(added, 5);
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![(1, 15)]);
    }

    #[test]
    fn merge_returns_newly_added_count() {
        let mut set = RangeSet::new();
        assert_eq!(set.merge(1, 10), 10);
        assert_eq!(set.merge(1, 10), 0);
        assert_eq!(set.merge(5, 15), 5);
    }

    #[test]
    fn merge_empty_range_is_noop() {
        let mut set = RangeSet::new();
        assert_eq!(set.merge(10, 5), 0);
        assert!(set.is_empty());
    }

    #[test]
    fn reduce_splits_ranges() {
        let mut set = RangeSet::new();
        set.merge(1, 10);
        set.reduce(4, 6);
        assert_eq!(
            set.iter().copied().collect::<Vec<_>>(),
            vec![(1, 3), (7, 10)]
        );
    }

    #[test]
    fn reduce_then_merge_restores_set() {
        let mut set = RangeSet::new();
        set.merge(1, 10);
        set.reduce(4, 6);
        set.merge(4, 6);
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![(1, 10)]);
    }

    #[test]
    fn covered_counts_intersection() {
        let mut set = RangeSet::new();
        set.merge(1, 10);
        set.merge(20, 30);
        assert_eq!(set.covered(5, 25), 6 + 6);
        assert_eq!(set.covered(11, 19), 0);
    }

    #[test]
    fn chunks_splits_by_max_len() {
        let mut set = RangeSet::new();
        set.merge(1, 7);
        assert_eq!(set.chunks(3), vec![(1, 3), (4, 6), (7, 7)]);
    }

    #[test]
    fn le_and_ge_report_boundary_ranges() {
        let mut set = RangeSet::new();
        set.merge(1, 5);
        set.merge(10, 15);
        assert_eq!(set.ge().unwrap(), (1, 5));
        assert_eq!(set.le().unwrap(), (10, 15));
    }

    #[test]
    fn le_and_ge_error_on_empty_set() {
        let set = RangeSet::new();
        assert!(set.le().is_err());
        assert!(set.ge().is_err());
    }

    #[test]
    fn unprocessed_ranges_fetch_falls_back_to_priority_1() {
        let mut ranges = UnprocessedRanges::new();
        ranges.priority_1.merge(1, 10);
        let (lo, hi, prio) = ranges.fetch(5).unwrap();
        assert_eq!((lo, hi, prio), (1, 5, 1));
    }

    proptest! {
        #[test]
        fn merge_is_commutative(a_lo in 0u64..1000, a_len in 0u64..50,
                                 b_lo in 0u64..1000, b_len in 0u64..50) {
            let (a_hi, b_hi) = (a_lo + a_len, b_lo + b_len);

            let mut set_ab = RangeSet::new();
            set_ab.merge(a_lo, a_hi);
            set_ab.merge(b_lo, b_hi);

            let mut set_ba = RangeSet::new();
            set_ba.merge(b_lo, b_hi);
            set_ba.merge(a_lo, a_hi);

            prop_assert_eq!(set_ab, set_ba);
        }

        #[test]
        fn covered_never_exceeds_range_len(lo in 0u64..1000, len in 0u64..100,
                                            q_lo in 0u64..1000, q_len in 0u64..100) {
            let hi = lo + len;
            let q_hi = q_lo + q_len;
            let mut set = RangeSet::new();
            set.merge(lo, hi);
            prop_assert!(set.covered(q_lo, q_hi) <= q_hi - q_lo + 1);
        }

        #[test]
        fn merge_then_reduce_restores_set_when_absent(lo in 0u64..1000, len in 0u64..50) {
            let hi = lo + len;
            let mut set = RangeSet::new();
            let before = set.clone();
            set.merge(lo, hi);
            set.reduce(lo, hi);
            prop_assert_eq!(set, before);
        }
    }
}
