//! Deterministic precedence order for URL table entries.
//!
//! 1. The catchall sorts last.
//! 2. More segments sort first.
//! 3. Segment by segment: literal before dynamic, longer before shorter,
//!    then lexicographic.

use std::cmp::Reverse;

use super::pattern::is_dynamic_segment;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SegmentKey {
    dynamic: bool,
    length: Reverse<usize>,
    text: String,
}

/// Sort key for one URL pattern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PrecedenceKey {
    catchall: bool,
    segment_count: Reverse<usize>,
    segments: Vec<SegmentKey>,
}

impl PrecedenceKey {
    pub fn new(pattern: &str, catchall: bool) -> Self {
        let segments: Vec<SegmentKey> = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| SegmentKey {
                dynamic: is_dynamic_segment(s),
                length: Reverse(s.len()),
                text: s.to_string(),
            })
            .collect();

        Self {
            catchall,
            segment_count: Reverse(segments.len()),
            segments,
        }
    }
}

/// Sort `items` in precedence order using `key` to get (pattern, is_catchall).
pub fn sort_by_precedence<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> (&str, bool),
{
    items.sort_by_cached_key(|item| {
        let (pattern, catchall) = key(item);
        PrecedenceKey::new(pattern, catchall)
    });
}
