//! Character sets.
//!
//! [`IntCharSet`] is the interval representation used while building the
//! character-class partition: a sorted list of disjoint, non-touching
//! [`Interval`]s over character codes. [`CharSet`] is a growable bitset over
//! class ids, used wherever a set of classes must be tested or iterated.

use std::fmt;

use bitvec::vec::BitVec;

use super::ClassId;

/// Closed interval `[start, end]` of character codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    pub start: u32,
    pub end: u32,
}

impl Interval {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "interval [{start}, {end}] is reversed");
        Interval { start, end }
    }

    pub fn single(c: u32) -> Self {
        Interval { start: c, end: c }
    }

    #[inline]
    pub fn contains(&self, c: u32) -> bool {
        self.start <= c && c <= self.end
    }

    /// Number of characters in the interval.
    pub fn size(&self) -> u64 {
        u64::from(self.end - self.start) + 1
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "'{}'", escape(self.start))
        } else {
            write!(f, "['{}'-'{}']", escape(self.start), escape(self.end))
        }
    }
}

fn escape(c: u32) -> String {
    match char::from_u32(c) {
        Some(ch) if !ch.is_control() && ch != '\'' && ch != '\\' => ch.to_string(),
        _ => format!("\\u{{{c:x}}}"),
    }
}

/// Set of character codes stored as sorted, disjoint, non-adjacent intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IntCharSet {
    intervals: Vec<Interval>,
}

impl IntCharSet {
    pub fn new() -> Self {
        IntCharSet { intervals: Vec::new() }
    }

    pub fn from_interval(interval: Interval) -> Self {
        IntCharSet { intervals: vec![interval] }
    }

    pub fn from_char(c: u32) -> Self {
        Self::from_interval(Interval::single(c))
    }

    pub fn from_intervals<I: IntoIterator<Item = Interval>>(intervals: I) -> Self {
        let mut set = IntCharSet::new();
        for interval in intervals {
            set.add_interval(interval);
        }
        set
    }

    /// The full range `[0, max_char]`.
    pub fn all(max_char: u32) -> Self {
        Self::from_interval(Interval::new(0, max_char))
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn num_intervals(&self) -> usize {
        self.intervals.len()
    }

    /// Number of characters in the set.
    pub fn size(&self) -> u64 {
        self.intervals.iter().map(Interval::size).sum()
    }

    /// Add an interval, merging it with every interval it overlaps or touches.
    pub fn add_interval(&mut self, interval: Interval) {
        let mut merged = interval;
        let mut result = Vec::with_capacity(self.intervals.len() + 1);
        let mut placed = false;

        for &current in &self.intervals {
            if current.end.saturating_add(1) < merged.start {
                result.push(current);
            } else if merged.end.saturating_add(1) < current.start {
                if !placed {
                    result.push(merged);
                    placed = true;
                }
                result.push(current);
            } else {
                merged.start = merged.start.min(current.start);
                merged.end = merged.end.max(current.end);
            }
        }
        if !placed {
            result.push(merged);
        }
        self.intervals = result;
    }

    pub fn add_char(&mut self, c: u32) {
        self.add_interval(Interval::single(c));
    }

    /// Union with `other`.
    pub fn add_set(&mut self, other: &IntCharSet) {
        for &interval in &other.intervals {
            self.add_interval(interval);
        }
    }

    pub fn contains(&self, c: u32) -> bool {
        self.intervals
            .binary_search_by(|iv| {
                if iv.end < c {
                    std::cmp::Ordering::Less
                } else if iv.start > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Whether every character of `other` is also in `self`.
    pub fn contains_set(&self, other: &IntCharSet) -> bool {
        let mut i = 0;
        for iv in &other.intervals {
            while i < self.intervals.len() && self.intervals[i].end < iv.start {
                i += 1;
            }
            match self.intervals.get(i) {
                Some(mine) if mine.start <= iv.start && iv.end <= mine.end => {}
                _ => return false,
            }
        }
        true
    }

    /// Intersection of `self` and `other`.
    pub fn and(&self, other: &IntCharSet) -> IntCharSet {
        let mut result = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.intervals.len() && j < other.intervals.len() {
            let a = self.intervals[i];
            let b = other.intervals[j];
            let start = a.start.max(b.start);
            let end = a.end.min(b.end);
            if start <= end {
                result.push(Interval::new(start, end));
            }
            if a.end < b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        IntCharSet { intervals: result }
    }

    /// Remove `other` from `self`. `other` must be a subset of `self`.
    pub fn sub(&mut self, other: &IntCharSet) {
        debug_assert!(
            self.contains_set(other),
            "subtracting {other} which is not contained in {self}"
        );
        let mut result = Vec::with_capacity(self.intervals.len() + other.intervals.len());
        let mut j = 0;
        for &iv in &self.intervals {
            let mut start = iv.start;
            let mut exhausted = false;
            while j < other.intervals.len() && other.intervals[j].start <= iv.end {
                let hole = other.intervals[j];
                if hole.end < start {
                    j += 1;
                    continue;
                }
                if hole.start > start {
                    result.push(Interval::new(start, hole.start - 1));
                }
                if hole.end >= iv.end {
                    exhausted = true;
                    break;
                }
                start = hole.end + 1;
                j += 1;
            }
            if !exhausted {
                result.push(Interval::new(start, iv.end));
            }
        }
        self.intervals = result;
    }

    /// Complement relative to `[0, max_char]`.
    pub fn complement(&self, max_char: u32) -> IntCharSet {
        let mut result = IntCharSet::all(max_char);
        let clipped = self.and(&result);
        result.sub(&clipped);
        result
    }

    /// This set closed under single-character upper/lower case mapping.
    pub fn caseless(&self) -> IntCharSet {
        let mut result = self.clone();
        for iv in &self.intervals {
            for c in iv.start..=iv.end {
                for mapped in case_variants(c) {
                    result.add_char(mapped);
                }
            }
        }
        result
    }

    /// Smallest member, if any.
    pub fn first(&self) -> Option<u32> {
        self.intervals.first().map(|iv| iv.start)
    }
}

impl fmt::Display for IntCharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for (i, iv) in self.intervals.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{iv}")?;
        }
        write!(f, " }}")
    }
}

/// Lower and upper case counterparts of `c` that map to exactly one char.
pub fn case_variants(c: u32) -> impl Iterator<Item = u32> {
    let mut out = [None, None];
    if let Some(ch) = char::from_u32(c) {
        out[0] = single(ch.to_lowercase()).filter(|&m| m != c);
        out[1] = single(ch.to_uppercase()).filter(|&m| m != c);
    }
    out.into_iter().flatten()
}

fn single<I: Iterator<Item = char>>(mut mapping: I) -> Option<u32> {
    let first = mapping.next()?;
    match mapping.next() {
        None => Some(first as u32),
        Some(_) => None,
    }
}

/// Growable bitset of class ids with a cached element count.
#[derive(Debug, Clone, Default)]
pub struct CharSet {
    bits: BitVec<usize>,
    count: usize,
}

impl CharSet {
    const INITIAL_BITS: usize = 64;

    pub fn new() -> Self {
        CharSet { bits: BitVec::repeat(false, Self::INITIAL_BITS), count: 0 }
    }

    /// Insert `class`, doubling the storage until it fits.
    pub fn add(&mut self, class: ClassId) {
        let idx = class as usize;
        if idx >= self.bits.len() {
            let mut len = self.bits.len().max(Self::INITIAL_BITS);
            while len <= idx {
                len *= 2;
            }
            self.bits.resize(len, false);
        }
        if !self.bits[idx] {
            self.bits.set(idx, true);
            self.count += 1;
        }
    }

    #[inline]
    pub fn contains(&self, class: ClassId) -> bool {
        self.bits.get(class as usize).map(|b| *b).unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn size(&self) -> usize {
        self.count
    }

    /// Union with `other`.
    pub fn add_set(&mut self, other: &CharSet) {
        for class in other.iter() {
            self.add(class);
        }
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.bits.iter_ones().map(|i| i as ClassId)
    }
}

impl PartialEq for CharSet {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.iter().eq(other.iter())
    }
}

impl Eq for CharSet {}

impl FromIterator<ClassId> for CharSet {
    fn from_iter<T: IntoIterator<Item = ClassId>>(iter: T) -> Self {
        let mut set = CharSet::new();
        for class in iter {
            set.add(class);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ivs: &[(u32, u32)]) -> IntCharSet {
        IntCharSet::from_intervals(ivs.iter().map(|&(a, b)| Interval::new(a, b)))
    }

    #[test]
    fn test_add_merges_touching_and_overlapping() {
        let mut s = set(&[(10, 20), (30, 40)]);
        s.add_interval(Interval::new(21, 29));
        assert_eq!(s.intervals(), &[Interval::new(10, 40)]);

        let mut s = set(&[(10, 20), (30, 40), (50, 60)]);
        s.add_interval(Interval::new(15, 55));
        assert_eq!(s.intervals(), &[Interval::new(10, 60)]);

        let mut s = set(&[(10, 20)]);
        s.add_interval(Interval::new(0, 5));
        s.add_interval(Interval::new(25, 26));
        assert_eq!(s.num_intervals(), 3);
        assert_eq!(s.first(), Some(0));
    }

    #[test]
    fn test_add_at_upper_bound_does_not_overflow() {
        let mut s = set(&[(u32::MAX - 1, u32::MAX)]);
        s.add_interval(Interval::new(0, 3));
        assert_eq!(s.num_intervals(), 2);
        assert!(s.contains(u32::MAX));
    }

    #[test]
    fn test_and_and_sub() {
        let a = set(&[(0, 10), (20, 30)]);
        let b = set(&[(5, 25)]);
        assert_eq!(a.and(&b), set(&[(5, 10), (20, 25)]));

        let mut c = a.clone();
        c.sub(&set(&[(3, 4), (20, 30)]));
        assert_eq!(c, set(&[(0, 2), (5, 10)]));

        let mut d = set(&[(0, 100)]);
        d.sub(&set(&[(0, 0), (50, 60), (100, 100)]));
        assert_eq!(d, set(&[(1, 49), (61, 99)]));
    }

    #[test]
    fn test_contains_set_and_complement() {
        let a = set(&[(0, 10), (20, 30)]);
        assert!(a.contains_set(&set(&[(2, 3), (25, 30)])));
        assert!(!a.contains_set(&set(&[(9, 21)])));
        assert_eq!(a.complement(40), set(&[(11, 19), (31, 40)]));
        assert!(a.contains(20) && !a.contains(15));
    }

    #[test]
    fn test_caseless() {
        let s = IntCharSet::from_char('a' as u32).caseless();
        assert!(s.contains('A' as u32) && s.contains('a' as u32));
        assert_eq!(s.size(), 2);
        let digits = set(&[('0' as u32, '9' as u32)]).caseless();
        assert_eq!(digits.size(), 10);
    }

    #[test]
    fn test_charset_grows_by_doubling() {
        let mut s = CharSet::new();
        s.add(3);
        s.add(200);
        s.add(3);
        assert_eq!(s.size(), 2);
        assert!(s.contains(200) && !s.contains(199) && !s.contains(10_000));
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![3, 200]);
        let t: CharSet = [200, 3].into_iter().collect();
        assert_eq!(s, t);
    }
}
