//! View tag paired with its index in the parent, for child manage operations.

use std::cmp::Ordering;
use std::fmt;

/// A child view tag and the index it occupies in its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewAtIndex {
    pub tag: i32,
    pub index: i32,
}

impl ViewAtIndex {
    pub const fn new(tag: i32, index: i32) -> Self {
        Self { tag, index }
    }
}

impl Ord for ViewAtIndex {
    /// By index; tag breaks ties so the order stays consistent with `Eq`.
    fn cmp(&self, other: &Self) -> Ordering {
        self.index
            .cmp(&other.index)
            .then_with(|| self.tag.cmp(&other.tag))
    }
}

impl PartialOrd for ViewAtIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ViewAtIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.index, self.tag)
    }
}

/// Sorts `views` by index. Stable: entries with equal indices keep their order.
pub fn sort_by_index(views: &mut [ViewAtIndex]) {
    views.sort_by_key(|v| v.index);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_by_index_keeping_ties_in_place() {
        let mut views = vec![
            ViewAtIndex::new(30, 2),
            ViewAtIndex::new(11, 0),
            ViewAtIndex::new(20, 1),
            ViewAtIndex::new(10, 0),
        ];
        sort_by_index(&mut views);
        let tags: Vec<i32> = views.iter().map(|v| v.tag).collect();
        assert_eq!(tags, vec![11, 10, 20, 30]);

        views.sort();
        let tags: Vec<i32> = views.iter().map(|v| v.tag).collect();
        assert_eq!(tags, vec![10, 11, 20, 30]);
    }

    #[test]
    fn displays_index_then_tag() {
        assert_eq!(ViewAtIndex::new(42, 3).to_string(), "[3, 42]");
    }
}
